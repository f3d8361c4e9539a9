// GitHub repository search types.
// Defines the search key model and the defensively-mapped record shape
// handed to consumers.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder shown when a repository has no description.
pub const NO_DESCRIPTION: &str = "No description provided.";

/// Placeholder owner for items missing owner information.
pub const UNKNOWN_OWNER: &str = "Unknown";

/// Result ordering accepted by the search API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum SearchSort {
    /// Best-match ranking (the API default).
    #[default]
    Relevance,
    Stars,
    Updated,
}

impl SearchSort {
    /// Value sent in the `sort` query parameter. Relevance is expressed
    /// as an empty string, which the API treats as best-match.
    pub fn query_value(self) -> &'static str {
        match self {
            SearchSort::Relevance => "",
            SearchSort::Stars => "stars",
            SearchSort::Updated => "updated",
        }
    }
}

impl fmt::Display for SearchSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchSort::Relevance => "relevance",
            SearchSort::Stars => "stars",
            SearchSort::Updated => "updated",
        })
    }
}

/// What a search session is looking for: query text, ordering, and an
/// optional language filter. Pages of one session share these terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    pub query: String,
    pub sort: SearchSort,
    pub language: Option<String>,
}

impl SearchTerms {
    /// Normalizes raw user input: the query is trimmed, and a blank or
    /// "All" language filter collapses to no filter at all.
    pub fn new(query: &str, sort: SearchSort, language: Option<&str>) -> Self {
        Self {
            query: query.trim().to_string(),
            sort,
            language: normalize_language(language),
        }
    }

    /// Cache key for one page of this search.
    pub fn key(&self, page: u32) -> SearchKey {
        debug_assert!(page >= 1, "search pages are 1-based");
        SearchKey {
            query: self.query.clone(),
            sort: self.sort,
            language: self.language.clone(),
            page,
        }
    }
}

fn normalize_language(language: Option<&str>) -> Option<String> {
    let trimmed = language?.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return None;
    }
    Some(trimmed.to_string())
}

/// Identity of a single result page. Two keys are interchangeable only
/// when every field matches, including the page number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    pub query: String,
    pub sort: SearchSort,
    pub language: Option<String>,
    pub page: u32,
}

/// One repository as presented to consumers. Fields the API omitted are
/// already resolved to their placeholder values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryRecord {
    pub name: String,
    pub html_url: String,
    pub description: String,
    pub star_count: u64,
    pub language: Option<String>,
    pub owner_login: String,
    pub created_at: Option<DateTime<Utc>>,
    pub watcher_count: u64,
}

impl RepositoryRecord {
    /// Maps a raw search item onto the presentation shape, filling in
    /// placeholders for anything absent or blank.
    pub(crate) fn from_raw(raw: RawItem) -> Self {
        let description = match raw.description {
            Some(text) if !text.trim().is_empty() => text,
            _ => NO_DESCRIPTION.to_string(),
        };
        let owner_login = raw
            .owner
            .and_then(|owner| owner.login)
            .unwrap_or_else(|| UNKNOWN_OWNER.to_string());
        Self {
            name: raw.name.unwrap_or_default(),
            html_url: raw.html_url.unwrap_or_default(),
            description,
            star_count: raw.stargazers_count.unwrap_or(0),
            language: raw.language,
            owner_login,
            created_at: raw.created_at,
            watcher_count: raw.watchers.unwrap_or(0),
        }
    }
}

/// One fetched page, already mapped and ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub records: Vec<RepositoryRecord>,
    pub total_count: u64,
    pub is_last_page: bool,
}

impl PageResult {
    /// The empty terminal page returned when the API refuses to go
    /// deeper into a result window.
    pub(crate) fn end_of_results() -> Self {
        Self {
            records: Vec::new(),
            total_count: 0,
            is_last_page: true,
        }
    }
}

/// Raw search response envelope. Both fields are optional on the wire;
/// a missing item list reads as an empty page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SearchResponse {
    pub total_count: u64,
    pub items: Option<Vec<serde_json::Value>>,
}

/// Raw repository item as the API serializes it. Every field is
/// optional so one malformed entry never sinks the page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawItem {
    pub name: Option<String>,
    pub html_url: Option<String>,
    pub description: Option<String>,
    pub stargazers_count: Option<u64>,
    pub language: Option<String>,
    pub owner: Option<RawOwner>,
    pub created_at: Option<DateTime<Utc>>,
    pub watchers: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawOwner {
    pub login: Option<String>,
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
}
