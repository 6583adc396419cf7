//! Provider strategy tables.
//!
//! One `Provider` value per upstream site, collected in a `ProviderRegistry`
//! keyed by id. All provider-specific knowledge (mirrors, selectors,
//! extraction patterns, endpoint templates) lives in these tables; the
//! resolver itself has no per-provider code paths. Upstream sites change
//! their markup without notice, so the table values are tunable data, not a
//! contract.

pub mod animepahe;
pub mod gogoanime;

use crate::validate::Marker;

#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub search: bool,
    pub info: bool,
    pub watch: bool,
}

/// An alternate base domain serving equivalent content. Lower priority
/// means tried earlier. Health is ephemeral, tracked only as the mirror
/// registry's in-memory hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    pub base: String,
    pub priority: u8,
}

/// Everything the resolver needs to know about one upstream provider.
#[derive(Debug, Clone)]
pub struct Provider {
    pub id: String,
    pub capabilities: Capabilities,
    pub mirrors: Vec<Mirror>,
    /// Header-profile name from the resolver config.
    pub header_profile: String,
    /// Referer the stream relay presents when fetching this provider's media.
    pub playback_referer: Option<String>,
    /// Host fragments that map a media URL back to this provider for the
    /// relay's referer table.
    pub hosts: Vec<String>,
    pub search: Option<SearchTable>,
    pub info: Option<InfoTable>,
    pub watch: Option<WatchTable>,
}

/// How to scrape the provider's search page.
#[derive(Debug, Clone)]
pub struct SearchTable {
    /// `{base}` and `{query}` placeholders.
    pub url_template: String,
    pub marker: Marker,
    pub item_selector: String,
    pub title_selector: String,
    /// Anchor whose href carries the series id.
    pub link_selector: String,
    /// Prefix stripped from the href to recover the bare id.
    pub link_strip_prefix: String,
    pub image_selector: String,
    pub release_selector: String,
    /// Whether a blocked search may fall back to synthesizing an id from
    /// the query. Synthesized results are flagged `guessed`.
    pub allow_guess: bool,
    pub guess_release_label: String,
}

/// How to scrape a series page and its episode list.
#[derive(Debug, Clone)]
pub struct InfoTable {
    /// `{base}` and `{id}` placeholders.
    pub url_template: String,
    pub marker: Marker,
    pub title_selector: String,
    pub image_selector: String,
    pub description_selector: String,
    /// Hidden input carrying the provider-internal numeric id.
    pub internal_id_selector: String,
    /// Hidden input carrying the alias token the episode endpoint wants.
    pub alias_selector: String,
    /// Element whose attribute bounds the episode range.
    pub ep_end_selector: String,
    pub ep_end_attr: String,
    pub ep_end_default: String,
    /// Episode-list endpoints, tried in order. Placeholders: `{base}`,
    /// `{id}`, `{movie_id}`, `{alias}`, `{ep_end}`.
    pub episode_endpoints: Vec<String>,
    pub episode_item_selector: String,
    pub episode_link_selector: String,
    pub episode_name_selector: String,
    /// Label prefix stripped before parsing the episode number ("EP ").
    pub episode_name_prefix: String,
    /// Bodies containing this marker are bounce pages, not episode lists.
    pub redirect_marker: String,
}

/// How to turn an episode page into a playable stream.
#[derive(Debug, Clone)]
pub struct WatchTable {
    /// `{base}` and `{episode_id}` placeholders.
    pub url_template: String,
    /// Embed-candidate selectors in priority order: the named preferred
    /// server slot first, the generic embed frame last.
    pub embed_selectors: Vec<EmbedSelector>,
    /// Regex that pulls the video id out of a candidate URL.
    pub embed_id_pattern: Option<String>,
    /// Canonical player URL built from the extracted id (`{id}`
    /// placeholder). Candidates whose id cannot be extracted are used as-is.
    pub canonical_embed_template: Option<String>,
    /// Strategy (a): direct key/value file-URL pattern.
    pub file_pattern: String,
    /// Strategy (b): structured multi-source list blob.
    pub source_list_pattern: String,
    /// Strategy (c): any bare absolute playable-media URL.
    pub bare_url_pattern: String,
    /// Whether resolved streams need Referer/User-Agent at playback time.
    pub require_playback_headers: bool,
}

#[derive(Debug, Clone)]
pub struct EmbedSelector {
    pub selector: String,
    pub attr: String,
}

/// The configured providers, in declared priority order.
pub struct ProviderRegistry {
    providers: Vec<Provider>,
}

impl ProviderRegistry {
    /// The providers this build ships with.
    pub fn builtin() -> Self {
        Self { providers: vec![gogoanime::provider(), animepahe::provider()] }
    }

    pub fn with_providers(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    pub fn get(&self, id: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.iter()
    }

    /// Referer for a media URL, by matching its host against each
    /// provider's host fragments.
    pub fn referer_for_host(&self, host: &str) -> Option<&str> {
        for provider in &self.providers {
            if provider.hosts.iter().any(|h| host.contains(h.as_str())) {
                return provider.playback_referer.as_deref();
            }
        }
        None
    }
}
