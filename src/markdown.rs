// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Markdown rendering for fetched discussions.
//!
//! Each discussion becomes one Markdown document with a fixed section order:
//! title heading, an attribution block (author link, ISO-8601 creation time,
//! URL, category when present), a `Discussion` section with the body, and a
//! `Comments` section only when comments were requested and exist. Absent
//! optional fields are omitted, never rendered as empty placeholders.

use crate::github::{Comment, Discussion};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

/// Longest slug carried into a generated filename.
const MAX_SLUG_CHARS: usize = 100;

/// Renders a discussion as a Markdown document.
///
/// Comments are rendered only when `include_comments` is set and the
/// discussion has any; otherwise no `Comments` section appears at all.
#[must_use]
pub fn render_discussion(discussion: &Discussion, include_comments: bool) -> String {
    let mut out = String::new();

    writeln!(out, "# {}\n", discussion.title).unwrap();
    writeln!(out, "**Author:** {}  ", author_link(discussion.author.as_deref())).unwrap();
    writeln!(out, "**Created:** {}  ", timestamp(&discussion.created_at)).unwrap();
    writeln!(out, "**URL:** {}  ", discussion.url).unwrap();
    if let Some(category) = &discussion.category {
        writeln!(out, "**Category:** {category}  ").unwrap();
    }
    writeln!(out, "\n## Discussion\n\n{}", discussion.body).unwrap();

    if include_comments && !discussion.comments.is_empty() {
        writeln!(out, "\n## Comments").unwrap();
        for comment in &discussion.comments {
            render_comment(&mut out, comment);
        }
    }

    out
}

fn render_comment(out: &mut String, comment: &Comment) {
    writeln!(
        out,
        "\n### {} - {}\n\n{}",
        author_link(comment.author.as_deref()),
        timestamp(&comment.created_at),
        comment.body
    )
    .unwrap();
}

/// Returns the output filename for a discussion.
///
/// The shape is `{YYYYMMDD}-{slug}-{number}.md`; the discussion number keeps
/// names collision-free when two discussions share a creation date and a
/// sanitized title.
#[must_use]
pub fn discussion_filename(discussion: &Discussion) -> String {
    format!(
        "{}-{}-{}.md",
        discussion.created_at.format("%Y%m%d"),
        sanitize_title(&discussion.title),
        discussion.number
    )
}

/// Reduces a title to a filesystem-safe slug: lowercase, word characters
/// and hyphens only, whitespace runs collapsed to `_`, capped in length.
fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect()
}

/// Deleted accounts have no handle; render them as plain "Anonymous".
fn author_link(author: Option<&str>) -> String {
    author.map_or_else(
        || "Anonymous".to_owned(),
        |login| format!("[{login}](https://github.com/{login})"),
    )
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
