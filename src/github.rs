// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! HTTP transport and the typed fetch boundary for GitHub's APIs.
//!
//! Discussions come from the GraphQL API (cursor pagination), releases from
//! the REST API (page-number pagination). Both listings are driven through
//! [`crate::paginate`] and validated into typed records here at the boundary;
//! a malformed payload is a [`FetchError`] at fetch time, never a deferred
//! failure downstream.
//!
//! Requests are issued sequentially, one page at a time, with a bearer token
//! on every request. Rate-limit responses are surfaced as failures rather
//! than retried.

use crate::paginate::{self, Page, PageCursor, PageSource};
use crate::version::{self, VersionKey};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use snafu::prelude::*;
use std::time::Duration;

const GITHUB_API: &str = "https://api.github.com";

/// GraphQL page size for discussions.
const DISCUSSION_PAGE_SIZE: usize = 50;
/// Comments fetched per discussion when comments are requested.
const COMMENT_PAGE_SIZE: usize = 50;
/// REST page size for releases (the API maximum).
const RELEASE_PAGE_SIZE: usize = 100;

/// Error type for failed fetches: transport problems and payloads that do
/// not match the expected shape.
#[derive(Debug, Snafu)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[snafu(display("failed to build HTTP client: {source}"))]
    BuildClient {
        /// The underlying client construction error.
        source: reqwest::Error,
    },

    /// The request never produced a usable response.
    #[snafu(display("request to GitHub failed: {source}"))]
    Request {
        /// The underlying transport error.
        source: reqwest::Error,
    },

    /// GitHub answered with a non-success status.
    #[snafu(display("GitHub returned HTTP {status}: {body}"))]
    Status {
        /// The HTTP status code.
        status: u16,
        /// An excerpt of the response body.
        body: String,
    },

    /// The API rate limit is exhausted; the run aborts rather than retrying.
    #[snafu(display("GitHub API rate limit exhausted"))]
    RateLimited,

    /// The response body did not match the expected payload shape.
    #[snafu(display("unexpected GitHub payload: {source}"))]
    Payload {
        /// The underlying deserialization error.
        source: serde_json::Error,
    },

    /// The GraphQL API reported an error for the query.
    #[snafu(display("GraphQL error: {message}"))]
    GraphQl {
        /// The error message returned by the API.
        message: String,
    },
}

/// A discussion fetched from a repository.
///
/// Immutable once fetched; the lifecycle is fetch, format, write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discussion {
    /// Repository-scoped discussion number; used for collision-free naming.
    pub number: u64,
    /// Discussion title.
    pub title: String,
    /// Author handle; `None` when the account no longer exists.
    pub author: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Web URL of the discussion.
    pub url: String,
    /// Body text (markdown).
    pub body: String,
    /// Category name, when the discussion has one.
    pub category: Option<String>,
    /// Comments, populated only when comments were requested.
    pub comments: Vec<Comment>,
}

/// A comment on a discussion; owned by its parent [`Discussion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Commenter handle; `None` when the account no longer exists.
    pub author: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Comment body (markdown).
    pub body: String,
}

/// A release fetched from a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// The raw tag string, e.g. `v24.1.1`.
    pub tag: String,
    /// Release name; falls back to the tag when the API reports none.
    pub name: String,
    /// Derived major.minor key; `None` when the tag did not normalize.
    pub version: Option<VersionKey>,
    /// Publication timestamp; drafts have none.
    pub published_at: Option<DateTime<Utc>>,
    /// Web URL of the release.
    pub url: String,
    /// Whether the release is marked as a prerelease.
    pub prerelease: bool,
    /// Whether the release is an unpublished draft.
    pub draft: bool,
    /// Raw release notes (markdown).
    pub body: String,
}

/// Parameters for a discussions fetch.
#[derive(Debug, Clone)]
pub struct DiscussionRequest<'a> {
    /// Repository owner (user or organization).
    pub owner: &'a str,
    /// Repository name.
    pub repo: &'a str,
    /// Optional discussion category ID to filter by.
    pub category_id: Option<&'a str>,
    /// Whether to fetch comments alongside each discussion.
    pub include_comments: bool,
    /// Maximum number of discussions; `None` fetches to exhaustion.
    pub limit: Option<usize>,
}

/// Authenticated GitHub API client.
///
/// Wraps a blocking HTTP client; every fetch runs sequentially, one page
/// request at a time.
pub struct Client {
    http: reqwest::blocking::Client,
    token: String,
}

impl Client {
    /// Creates a client that authenticates with `token` as a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::BuildClient`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(token: &str) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context(BuildClientSnafu)?;
        Ok(Self {
            http,
            token: token.to_owned(),
        })
    }

    /// Fetches discussions via the GraphQL API, following cursors until the
    /// requested limit or exhaustion.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] for the first failed page request, non-2xx
    /// status, rate-limit response, GraphQL error, or malformed payload.
    pub fn fetch_discussions(
        &self,
        request: &DiscussionRequest<'_>,
    ) -> Result<Vec<Discussion>, FetchError> {
        let mut source = DiscussionPages {
            client: self,
            query: discussion_query(request.category_id, request.include_comments),
            owner: request.owner,
            repo: request.repo,
        };
        paginate::collect_items(&mut source, request.limit)
    }

    /// Fetches releases via the REST API, newest first, following page
    /// numbers until the requested limit or exhaustion.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] for the first failed page request, non-2xx
    /// status, rate-limit response, or malformed payload.
    pub fn fetch_releases(
        &self,
        owner: &str,
        repo: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Release>, FetchError> {
        let mut source = ReleasePages {
            client: self,
            owner,
            repo,
        };
        paginate::collect_items(&mut source, limit)
    }

    fn post_graphql(&self, body: &serde_json::Value) -> Result<String, FetchError> {
        let response = self
            .http
            .post(format!("{GITHUB_API}/graphql"))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .context(RequestSnafu)?;
        Self::read_body(response)
    }

    fn get_rest(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .context(RequestSnafu)?;
        Self::read_body(response)
    }

    fn read_body(response: reqwest::blocking::Response) -> Result<String, FetchError> {
        let status = response.status().as_u16();
        let remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().context(RequestSnafu)?;
        classify_response(status, remaining.as_deref(), body)
    }
}

/// Maps a response's status to its body or a failure. Rate limiting is
/// HTTP 429, or 403 with the remaining-request header at zero.
fn classify_response(
    status: u16,
    ratelimit_remaining: Option<&str>,
    body: String,
) -> Result<String, FetchError> {
    if status == 429 || (status == 403 && ratelimit_remaining == Some("0")) {
        return RateLimitedSnafu.fail();
    }
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        StatusSnafu {
            status,
            body: excerpt(&body),
        }
        .fail()
    }
}

fn excerpt(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        trimmed.to_owned()
    } else {
        let cut: String = trimmed.chars().take(MAX_CHARS).collect();
        format!("{cut}...")
    }
}

struct DiscussionPages<'a> {
    client: &'a Client,
    query: String,
    owner: &'a str,
    repo: &'a str,
}

impl PageSource for DiscussionPages<'_> {
    type Item = Discussion;
    type Error = FetchError;

    fn fetch_page(&mut self, token: Option<&str>) -> Result<Page<Discussion>, FetchError> {
        let body = serde_json::json!({
            "query": self.query,
            "variables": {
                "owner": self.owner,
                "repo": self.repo,
                "first": DISCUSSION_PAGE_SIZE,
                "after": token,
            }
        });
        let text = self.client.post_graphql(&body)?;
        parse_discussion_page(&text)
    }
}

struct ReleasePages<'a> {
    client: &'a Client,
    owner: &'a str,
    repo: &'a str,
}

impl PageSource for ReleasePages<'_> {
    type Item = Release;
    type Error = FetchError;

    fn fetch_page(&mut self, token: Option<&str>) -> Result<Page<Release>, FetchError> {
        // The token round-trips our own page number.
        let page: u32 = token.map_or(1, |t| t.parse().unwrap_or(1));
        let url = format!(
            "{GITHUB_API}/repos/{}/{}/releases?per_page={RELEASE_PAGE_SIZE}&page={page}",
            self.owner, self.repo
        );
        let text = self.client.get_rest(&url)?;
        parse_release_page(&text, RELEASE_PAGE_SIZE, page)
    }
}

/// Builds the GraphQL query text. The category filter and the comments
/// connection are included only when asked for, so unrequested comments are
/// never fetched.
fn discussion_query(category_id: Option<&str>, include_comments: bool) -> String {
    let category = category_id
        .map(|id| format!(", categoryId: \"{}\"", escape_graphql_string(id)))
        .unwrap_or_default();
    let comments = if include_comments {
        format!(
            "\n        comments(first: {COMMENT_PAGE_SIZE}) {{ nodes {{ author {{ login }} body createdAt }} }}"
        )
    } else {
        String::new()
    };
    format!(
        "query($owner: String!, $repo: String!, $first: Int!, $after: String) {{
  repository(owner: $owner, name: $repo) {{
    discussions(first: $first, after: $after{category}) {{
      pageInfo {{ hasNextPage endCursor }}
      nodes {{
        number
        title
        body
        url
        createdAt
        author {{ login }}
        category {{ name }}{comments}
      }}
    }}
  }}
}}"
    )
}

fn escape_graphql_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Deserialize)]
struct GraphQlReply {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Deserialize)]
struct GraphQlData {
    repository: Option<RepositoryNode>,
}

#[derive(Deserialize)]
struct RepositoryNode {
    discussions: DiscussionConnection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscussionConnection {
    page_info: PageInfo,
    nodes: Vec<DiscussionNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscussionNode {
    number: u64,
    title: String,
    body: String,
    url: String,
    created_at: DateTime<Utc>,
    author: Option<Actor>,
    category: Option<CategoryNode>,
    comments: Option<CommentConnection>,
}

#[derive(Deserialize)]
struct Actor {
    login: String,
}

#[derive(Deserialize)]
struct CategoryNode {
    name: String,
}

#[derive(Deserialize)]
struct CommentConnection {
    nodes: Vec<CommentNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentNode {
    author: Option<Actor>,
    body: String,
    created_at: DateTime<Utc>,
}

impl From<DiscussionNode> for Discussion {
    fn from(node: DiscussionNode) -> Self {
        Self {
            number: node.number,
            title: node.title,
            author: node.author.map(|actor| actor.login),
            created_at: node.created_at,
            url: node.url,
            body: node.body,
            category: node.category.map(|category| category.name),
            comments: node
                .comments
                .map(|connection| connection.nodes.into_iter().map(Comment::from).collect())
                .unwrap_or_default(),
        }
    }
}

impl From<CommentNode> for Comment {
    fn from(node: CommentNode) -> Self {
        Self {
            author: node.author.map(|actor| actor.login),
            created_at: node.created_at,
            body: node.body,
        }
    }
}

#[derive(Deserialize)]
struct ReleaseNode {
    tag_name: String,
    name: Option<String>,
    body: Option<String>,
    html_url: String,
    published_at: Option<DateTime<Utc>>,
    prerelease: bool,
    draft: bool,
}

impl From<ReleaseNode> for Release {
    fn from(node: ReleaseNode) -> Self {
        Self {
            name: node
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| node.tag_name.clone()),
            version: version::parse(&node.tag_name).ok(),
            tag: node.tag_name,
            published_at: node.published_at,
            url: node.html_url,
            prerelease: node.prerelease,
            draft: node.draft,
            body: node.body.unwrap_or_default(),
        }
    }
}

/// Validates one GraphQL discussions page into typed records.
pub(crate) fn parse_discussion_page(body: &str) -> Result<Page<Discussion>, FetchError> {
    let reply: GraphQlReply = serde_json::from_str(body).context(PayloadSnafu)?;

    if let Some(error) = reply.errors.into_iter().next() {
        return GraphQlSnafu {
            message: error.message,
        }
        .fail();
    }

    let repository = reply
        .data
        .and_then(|data| data.repository)
        .context(GraphQlSnafu {
            message: "response carries no repository",
        })?;

    let connection = repository.discussions;
    let cursor = match (
        connection.page_info.has_next_page,
        connection.page_info.end_cursor,
    ) {
        (true, Some(token)) => PageCursor::next(token),
        _ => PageCursor::end(),
    };

    Ok(Page {
        items: connection.nodes.into_iter().map(Discussion::from).collect(),
        cursor,
    })
}

/// Validates one REST releases page into typed records.
pub(crate) fn parse_release_page(
    body: &str,
    per_page: usize,
    page: u32,
) -> Result<Page<Release>, FetchError> {
    let nodes: Vec<ReleaseNode> = serde_json::from_str(body).context(PayloadSnafu)?;

    // A short page means the listing is exhausted.
    let cursor = if nodes.len() < per_page {
        PageCursor::end()
    } else {
        PageCursor::next((page + 1).to_string())
    };

    Ok(Page {
        items: nodes.into_iter().map(Release::from).collect(),
        cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionKey;

    fn discussion_page_json(nodes: &str, has_next: bool, end_cursor: &str) -> String {
        format!(
            r#"{{
                "data": {{
                    "repository": {{
                        "discussions": {{
                            "pageInfo": {{ "hasNextPage": {has_next}, "endCursor": {end_cursor} }},
                            "nodes": [{nodes}]
                        }}
                    }}
                }}
            }}"#
        )
    }

    const DISCUSSION_NODE: &str = r#"{
        "number": 42,
        "title": "How do I frobnicate?",
        "body": "Details inside.",
        "url": "https://github.com/owner/repo/discussions/42",
        "createdAt": "2024-03-01T09:30:00Z",
        "author": { "login": "alice" },
        "category": { "name": "Q&A" }
    }"#;

    #[test]
    fn parses_discussion_node() {
        let json = discussion_page_json(DISCUSSION_NODE, false, "null");
        let page = parse_discussion_page(&json).unwrap();

        assert_eq!(page.items.len(), 1);
        let discussion = &page.items[0];
        assert_eq!(discussion.number, 42);
        assert_eq!(discussion.title, "How do I frobnicate?");
        assert_eq!(discussion.author.as_deref(), Some("alice"));
        assert_eq!(discussion.category.as_deref(), Some("Q&A"));
        assert!(discussion.comments.is_empty());
        assert!(!page.cursor.has_more);
    }

    #[test]
    fn parses_cursor_for_further_pages() {
        let json = discussion_page_json(DISCUSSION_NODE, true, r#""Y3Vyc29yOjQy""#);
        let page = parse_discussion_page(&json).unwrap();

        assert!(page.cursor.has_more);
        assert_eq!(page.cursor.token.as_deref(), Some("Y3Vyc29yOjQy"));
    }

    #[test]
    fn missing_end_cursor_means_exhausted_even_if_has_next() {
        let json = discussion_page_json(DISCUSSION_NODE, true, "null");
        let page = parse_discussion_page(&json).unwrap();

        assert!(!page.cursor.has_more);
    }

    #[test]
    fn deleted_author_and_missing_category_become_none() {
        let node = r#"{
            "number": 7,
            "title": "Orphaned",
            "body": "",
            "url": "https://github.com/owner/repo/discussions/7",
            "createdAt": "2023-11-20T00:00:00Z",
            "author": null,
            "category": null
        }"#;
        let json = discussion_page_json(node, false, "null");
        let page = parse_discussion_page(&json).unwrap();

        assert!(page.items[0].author.is_none());
        assert!(page.items[0].category.is_none());
    }

    #[test]
    fn parses_comments_when_present() {
        let node = r#"{
            "number": 9,
            "title": "With comments",
            "body": "Body",
            "url": "https://github.com/owner/repo/discussions/9",
            "createdAt": "2024-01-05T12:00:00Z",
            "author": { "login": "alice" },
            "category": null,
            "comments": {
                "nodes": [
                    { "author": { "login": "bob" }, "body": "First!", "createdAt": "2024-01-05T13:00:00Z" },
                    { "author": null, "body": "Me too.", "createdAt": "2024-01-06T08:00:00Z" }
                ]
            }
        }"#;
        let json = discussion_page_json(node, false, "null");
        let page = parse_discussion_page(&json).unwrap();

        let comments = &page.items[0].comments;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author.as_deref(), Some("bob"));
        assert!(comments[1].author.is_none());
    }

    #[test]
    fn graphql_errors_surface_with_their_message() {
        let json = r#"{ "data": null, "errors": [{ "message": "Could not resolve to a Repository" }] }"#;
        let err = parse_discussion_page(json).unwrap_err();

        assert!(matches!(err, FetchError::GraphQl { .. }));
        assert!(err.to_string().contains("Could not resolve"));
    }

    #[test]
    fn missing_repository_is_an_error() {
        let json = r#"{ "data": { "repository": null } }"#;
        let err = parse_discussion_page(json).unwrap_err();

        assert!(matches!(err, FetchError::GraphQl { .. }));
    }

    #[test]
    fn malformed_discussion_payload_is_a_payload_error() {
        let err = parse_discussion_page("not json").unwrap_err();
        assert!(matches!(err, FetchError::Payload { .. }));
    }

    const RELEASE_NODE: &str = r###"{
        "tag_name": "v24.1.1",
        "name": "Release 24.1.1",
        "body": "## Fixes\n- one",
        "html_url": "https://github.com/owner/repo/releases/tag/v24.1.1",
        "published_at": "2024-02-10T18:00:00Z",
        "prerelease": false,
        "draft": false
    }"###;

    #[test]
    fn parses_release_node_with_version_key() {
        let json = format!("[{RELEASE_NODE}]");
        let page = parse_release_page(&json, 100, 1).unwrap();

        let release = &page.items[0];
        assert_eq!(release.tag, "v24.1.1");
        assert_eq!(release.name, "Release 24.1.1");
        assert_eq!(release.version, Some(VersionKey { major: 24, minor: 1 }));
        assert!(!release.prerelease);
        assert!(!page.cursor.has_more);
    }

    #[test]
    fn release_name_falls_back_to_tag() {
        let json = r#"[{
            "tag_name": "v1.0.0",
            "name": null,
            "body": null,
            "html_url": "https://github.com/owner/repo/releases/tag/v1.0.0",
            "published_at": null,
            "prerelease": true,
            "draft": true
        }]"#;
        let page = parse_release_page(json, 100, 1).unwrap();

        let release = &page.items[0];
        assert_eq!(release.name, "v1.0.0");
        assert!(release.published_at.is_none());
        assert!(release.prerelease);
        assert!(release.draft);
        assert!(release.body.is_empty());
    }

    #[test]
    fn unversioned_tag_yields_no_key_rather_than_a_default() {
        let json = r#"[{
            "tag_name": "nightly",
            "name": "Nightly",
            "body": "",
            "html_url": "https://github.com/owner/repo/releases/tag/nightly",
            "published_at": "2024-02-10T18:00:00Z",
            "prerelease": false,
            "draft": false
        }]"#;
        let page = parse_release_page(json, 100, 1).unwrap();

        assert_eq!(page.items[0].version, None);
    }

    #[test]
    fn full_release_page_points_at_the_next_page() {
        let nodes: Vec<String> = (0..3).map(|i| {
            RELEASE_NODE.replace("v24.1.1", &format!("v24.1.{i}"))
        }).collect();
        let json = format!("[{}]", nodes.join(","));
        let page = parse_release_page(&json, 3, 4).unwrap();

        assert!(page.cursor.has_more);
        assert_eq!(page.cursor.token.as_deref(), Some("5"));
    }

    #[test]
    fn malformed_release_payload_is_a_payload_error() {
        let err = parse_release_page(r#"{"message": "Not Found"}"#, 100, 1).unwrap_err();
        assert!(matches!(err, FetchError::Payload { .. }));
    }

    #[test]
    fn query_includes_category_filter_only_when_set() {
        let with = discussion_query(Some("DIC_kwDOAbc123"), false);
        let without = discussion_query(None, false);

        assert!(with.contains(r#"categoryId: "DIC_kwDOAbc123""#));
        assert!(!without.contains("categoryId"));
    }

    #[test]
    fn query_includes_comments_only_when_requested() {
        let with = discussion_query(None, true);
        let without = discussion_query(None, false);

        assert!(with.contains("comments(first: 50)"));
        assert!(!without.contains("comments"));
    }

    #[test]
    fn category_id_is_escaped_into_the_query() {
        let query = discussion_query(Some(r#"we"ird\id"#), false);
        assert!(query.contains(r#"categoryId: "we\"ird\\id""#));
    }

    #[test]
    fn status_429_is_rate_limited() {
        let err = classify_response(429, None, String::new()).unwrap_err();
        assert!(matches!(err, FetchError::RateLimited));
    }

    #[test]
    fn status_403_with_remaining_zero_is_rate_limited() {
        let err = classify_response(403, Some("0"), String::new()).unwrap_err();
        assert!(matches!(err, FetchError::RateLimited));
    }

    #[test]
    fn status_403_without_exhausted_header_is_a_plain_status_error() {
        for remaining in [None, Some("42")] {
            let err = classify_response(403, remaining, "Forbidden".to_owned()).unwrap_err();
            assert!(matches!(err, FetchError::Status { status: 403, .. }));
        }
    }

    #[test]
    fn non_success_status_carries_a_body_excerpt() {
        let err = classify_response(404, Some("4999"), "Not Found".to_owned()).unwrap_err();

        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "Not Found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn success_status_passes_the_body_through() {
        let body = classify_response(200, Some("4999"), "payload".to_owned()).unwrap();
        assert_eq!(body, "payload");
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(500);
        let short = excerpt(&long);
        assert!(short.len() < 250);
        assert!(short.ends_with("..."));
    }
}
