use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single hit from a provider search page.
///
/// `id` is opaque and provider-scoped; it is only meaningful when passed back
/// to the same provider's info operation. `guessed` marks results whose id was
/// synthesized from the query instead of scraped from a search page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub release: Option<String>,
    #[serde(default)]
    pub guessed: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeriesInfo {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub episodes: Vec<Episode>,
}

/// One watchable episode. The id is composite: it always embeds the series id
/// (or session token) so a later watch request can be made from it alone.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Episode {
    pub id: String,
    pub number: f64,
}

/// A resolved, playable stream. `url` is always absolute. When
/// `headers` is present the player must send them (typically Referer and
/// User-Agent) or the CDN will refuse the request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StreamSource {
    pub url: String,
    pub quality: String,
    pub is_segmented: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// How a single fetch attempt reached (or failed to reach) the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPath {
    Direct,
    Tunnel(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    HttpStatus(u16),
    Transport,
    Challenge,
    TooShort,
}

/// Diagnostic record of one fetch attempt. Request-scoped, used for logging
/// only, never persisted.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub url: String,
    pub path: FetchPath,
    pub outcome: AttemptOutcome,
}

/// Outcome of a search resolution. Exhaustion is data: an empty `results`
/// list plus a diagnostic, never an error type crossing the boundary.
#[derive(Debug, Serialize, Clone)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn found(results: Vec<SearchResult>) -> Self {
        Self { results, error: None }
    }

    pub fn exhausted(msg: impl Into<String>) -> Self {
        Self { results: Vec::new(), error: Some(msg.into()) }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct InfoOutcome {
    pub info: Option<SeriesInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InfoOutcome {
    pub fn found(info: SeriesInfo) -> Self {
        Self { info: Some(info), error: None }
    }

    pub fn exhausted(msg: impl Into<String>) -> Self {
        Self { info: None, error: Some(msg.into()) }
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_none()
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct SourcesOutcome {
    pub sources: Vec<StreamSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourcesOutcome {
    pub fn found(sources: Vec<StreamSource>) -> Self {
        Self { sources, error: None }
    }

    pub fn exhausted(msg: impl Into<String>) -> Self {
        Self { sources: Vec::new(), error: Some(msg.into()) }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
