// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Release tag normalization and major.minor grouping.
//!
//! Release tags in the wild are inconsistent: `v24.1.1`, `24`, `1.2.3-beta`,
//! `release-5.2`, `node-v10.15.3`. [`parse`] reduces any of them to an
//! ordered (major, minor) [`VersionKey`] or an explicit failure — never a
//! silent default that could collide with a real version.
//!
//! [`group_major_minor`] collapses a newest-first release stream to the
//! release that introduced each major.minor line.

use crate::github::Release;
use snafu::prelude::*;
use std::fmt;

/// Error type for tags that carry no recognizable version.
#[derive(Debug, Snafu)]
pub enum VersionError {
    /// The tag has no numeric major segment (or its digits overflow).
    #[snafu(display("cannot derive a major.minor version from tag {tag:?}"))]
    Unparseable {
        /// The offending tag string.
        tag: String,
    },
}

/// An ordered (major, minor) version pair.
///
/// Two releases with an equal key belong to the same major.minor line.
/// Ordering is numeric on major, then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionKey {
    /// Major version number.
    pub major: u32,
    /// Minor version number; `0` when the tag has no second segment.
    pub minor: u32,
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Parses a free-form release tag into a [`VersionKey`].
///
/// The longest leading run of non-digit characters is stripped, so `v24.1.1`,
/// `release-5.2`, and `node-v10.15.3` all normalize. The remainder is split
/// on `.`: the first segment must be entirely numeric (major); the second
/// segment's leading digit run becomes the minor (`1-beta` truncates to `1`),
/// defaulting to `0` when there is no second segment. Extra segments are
/// ignored.
///
/// # Errors
///
/// Returns [`VersionError::Unparseable`] when no digits remain after the
/// prefix strip, the major segment is not purely numeric, a second segment
/// has no leading digit, or a segment overflows `u32`.
///
/// # Examples
///
/// ```
/// use hubdump::version::{VersionKey, parse};
///
/// assert_eq!(parse("v24.1.1").unwrap(), VersionKey { major: 24, minor: 1 });
/// assert_eq!(parse("24").unwrap(), VersionKey { major: 24, minor: 0 });
/// assert!(parse("latest").is_err());
/// ```
pub fn parse(tag: &str) -> Result<VersionKey, VersionError> {
    let numeric = tag.trim_start_matches(|c: char| !c.is_ascii_digit());
    let mut segments = numeric.split('.');

    let major: u32 = segments
        .next()
        .unwrap_or_default()
        .parse()
        .ok()
        .context(UnparseableSnafu { tag })?;

    let minor: u32 = match segments.next() {
        None => 0,
        Some(segment) => {
            let digits = segment
                .find(|c: char| !c.is_ascii_digit())
                .map_or(segment, |end| &segment[..end]);
            digits.parse().ok().context(UnparseableSnafu { tag })?
        }
    };

    Ok(VersionKey { major, minor })
}

/// Collapses a newest-first release sequence to the earliest release per
/// distinct [`VersionKey`].
///
/// GitHub's release listing is reverse-chronological, so the last release
/// seen for a key is the oldest — the one that introduced that major.minor
/// line — and replaces any earlier occurrence. Keys keep the order of their
/// first appearance in the input. Releases sharing a key and a timestamp are
/// resolved deterministically by input order (the later entry wins).
///
/// # Errors
///
/// Returns [`VersionError::Unparseable`] naming the first release whose tag
/// did not normalize; major-only output for a partially versioned listing
/// would be misleading, so the run aborts.
pub fn group_major_minor(releases: Vec<Release>) -> Result<Vec<Release>, VersionError> {
    let mut grouped: Vec<Release> = Vec::new();

    for release in releases {
        let Some(key) = release.version else {
            return UnparseableSnafu { tag: release.tag }.fail();
        };
        if let Some(slot) = grouped.iter_mut().find(|seen| seen.version == Some(key)) {
            *slot = release;
        } else {
            grouped.push(release);
        }
    }

    Ok(grouped)
}
