// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Export GitHub discussions and releases to local files.
//!
//! This crate fetches data from GitHub's GraphQL and REST APIs and renders
//! it to Markdown (discussions) or a table, JSON, or CSV document (releases).
//!
//! # Overview
//!
//! Each run performs one bounded fetch-and-render pass:
//!
//! 1. Pages through an API listing until a requested item count is reached
//!    or the API reports exhaustion
//! 2. Validates the payload into typed records at the fetch boundary
//! 3. Renders the records to the requested output format
//!
//! # Example
//!
//! ```no_run
//! use hubdump::{export, github, version};
//!
//! let client = github::Client::new("ghp_example").unwrap();
//! let releases = client.fetch_releases("rust-lang", "rust", Some(20)).unwrap();
//!
//! let earliest_per_line = version::group_major_minor(releases).unwrap();
//! println!("{}", export::render_table(&earliest_per_line));
//! ```
//!
//! # Modules
//!
//! - [`paginate`]: cursor-following page collection with an item limit
//! - [`github`]: HTTP transport and the typed fetch boundary
//! - [`version`]: tag normalization into major.minor keys and release grouping
//! - [`markdown`]: Markdown rendering for discussions
//! - [`export`]: table, JSON, and CSV rendering for releases

#![deny(missing_docs)]

pub mod export;
pub mod github;
pub mod markdown;
pub mod paginate;
pub mod version;
