// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Table, JSON, and CSV rendering for release records.
//!
//! All three formats draw from the same field set, so the CSV header matches
//! the JSON document key for key. JSON output is byte-stable: field order
//! follows the record struct and identical input always serializes
//! identically. File-producing formats refuse to clobber an existing path
//! unless overwriting was requested.

use crate::github::Release;
use chrono::SecondsFormat;
use serde::Serialize;
use snafu::prelude::*;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Error type for failed exports.
#[derive(Debug, Snafu)]
pub enum OutputError {
    /// The target path exists and overwriting was not requested.
    #[snafu(display("{} already exists (use --force to overwrite)", path.display()))]
    AlreadyExists {
        /// The path that was refused.
        path: PathBuf,
    },

    /// Writing the target file failed.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    Write {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Serializing the records to JSON failed.
    #[snafu(display("failed to serialize releases to JSON: {source}"))]
    Serialize {
        /// The underlying serialization error.
        source: serde_json::Error,
    },
}

/// Output format for release data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Fixed-column table on standard output.
    Table,
    /// JSON document (array of release objects).
    Json,
    /// CSV file (header plus one row per release).
    Csv,
}

impl Format {
    /// Parses a format name as given on the command line.
    #[must_use]
    pub fn from_arg(value: &str) -> Option<Self> {
        match value {
            "table" => Some(Self::Table),
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// The file extension conventionally used for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Table => "txt",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// The exported view of a release; the single field set shared by the JSON
/// and CSV formats.
#[derive(Serialize)]
struct ReleaseRecord<'a> {
    tag: &'a str,
    major_minor: Option<String>,
    name: &'a str,
    published_at: Option<String>,
    url: &'a str,
    prerelease: bool,
    draft: bool,
    body: &'a str,
}

impl<'a> From<&'a Release> for ReleaseRecord<'a> {
    fn from(release: &'a Release) -> Self {
        Self {
            tag: &release.tag,
            major_minor: release.version.map(|key| key.to_string()),
            name: &release.name,
            published_at: release
                .published_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            url: &release.url,
            prerelease: release.prerelease,
            draft: release.draft,
            body: &release.body,
        }
    }
}

const TABLE_WIDTH: usize = 100;

/// Renders releases as a fixed-column table for standard output.
#[must_use]
pub fn render_table(releases: &[Release]) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{:<20} {:<15} {:<30} {:<12} {:<10} {:<10}",
        "Version", "Major.Minor", "Name", "Published", "Prerelease", "Draft"
    )
    .unwrap();
    writeln!(out, "{}", "-".repeat(TABLE_WIDTH)).unwrap();

    for release in releases {
        writeln!(
            out,
            "{:<20} {:<15} {:<30} {:<12} {:<10} {:<10}",
            release.tag,
            release
                .version
                .map_or_else(|| "N/A".to_owned(), |key| key.to_string()),
            truncate_name(&release.name),
            release
                .published_at
                .map_or_else(|| "N/A".to_owned(), |at| at.format("%Y-%m-%d").to_string()),
            yes_no(release.prerelease),
            yes_no(release.draft),
        )
        .unwrap();
    }

    out
}

/// Renders releases as a pretty-printed JSON array.
///
/// Identical input produces byte-identical output.
///
/// # Errors
///
/// Returns [`OutputError::Serialize`] if serialization fails.
pub fn render_json(releases: &[Release]) -> Result<String, OutputError> {
    let records: Vec<ReleaseRecord<'_>> = releases.iter().map(ReleaseRecord::from).collect();
    let mut doc = serde_json::to_string_pretty(&records).context(SerializeSnafu)?;
    doc.push('\n');
    Ok(doc)
}

/// Renders releases as CSV with a fixed header matching the JSON field set.
#[must_use]
pub fn render_csv(releases: &[Release]) -> String {
    let mut out = String::from("tag,major_minor,name,published_at,url,prerelease,draft,body\n");

    for release in releases {
        let record = ReleaseRecord::from(release);
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            csv_field(record.tag),
            csv_field(record.major_minor.as_deref().unwrap_or("")),
            csv_field(record.name),
            csv_field(record.published_at.as_deref().unwrap_or("")),
            csv_field(record.url),
            record.prerelease,
            record.draft,
            csv_field(record.body),
        )
        .unwrap();
    }

    out
}

/// Writes rendered output to `path`.
///
/// # Errors
///
/// Returns [`OutputError::AlreadyExists`] when the path exists and `force`
/// is not set — the existing file is left untouched — and
/// [`OutputError::Write`] for filesystem failures.
pub fn write_output(path: &Path, contents: &str, force: bool) -> Result<(), OutputError> {
    ensure!(force || !path.exists(), AlreadyExistsSnafu { path });
    std::fs::write(path, contents).context(WriteSnafu { path })
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() > 30 {
        let head: String = name.chars().take(27).collect();
        format!("{head}...")
    } else {
        name.to_owned()
    }
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// RFC 4180 quoting: fields containing a comma, quote, or line break are
/// wrapped in quotes with inner quotes doubled.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}
