//! The fallback orchestrator.
//!
//! One logical operation (search | info | watch) walks configured providers
//! in priority order and, inside each provider, its mirrors in registry
//! order. The first valid, non-empty result wins and everything else is
//! abandoned. Every per-attempt failure is caught at the attempt boundary,
//! logged and discarded; only total exhaustion crosses the public API, and
//! there it is data (an empty outcome plus a diagnostic), never an error.

use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::extract;
use crate::helpers::slugify;
use crate::http_client::{FetchOptions, ShieldedClient};
use crate::mirrors::MirrorRegistry;
use crate::models::{
    InfoOutcome, SearchOutcome, SearchResult, SeriesInfo, SourcesOutcome, StreamSource,
};
use crate::providers::{InfoTable, Provider, ProviderRegistry, SearchTable, WatchTable};
use crate::relay::{self, RelayedStream};
use crate::stream::{self, Extraction};
use crate::validate;
use std::time::Duration;
use tokio::time::{sleep, timeout};

pub struct Resolver {
    registry: ProviderRegistry,
    client: ShieldedClient,
    mirrors: MirrorRegistry,
    config: ResolverConfig,
}

impl Resolver {
    /// Resolver over the built-in providers, config from `resolver.toml`
    /// or defaults.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with(ResolverConfig::load(), ProviderRegistry::builtin())
    }

    pub fn with(config: ResolverConfig, registry: ProviderRegistry) -> Result<Self, reqwest::Error> {
        let client = ShieldedClient::new(config.clone())?;
        Ok(Self { registry, client, mirrors: MirrorRegistry::new(), config })
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Search one provider. Exhaustion of every mirror degrades to
    /// identifier synthesis when the provider's tables allow it; the
    /// synthesized result carries `guessed = true` so callers can tell it
    /// from a scraped one.
    pub async fn resolve_search(&self, provider_id: &str, query: &str) -> SearchOutcome {
        let Some(provider) = self.registry.get(provider_id) else {
            return SearchOutcome::exhausted(format!("unknown provider {:?}", provider_id));
        };
        let Some(table) = provider.search.as_ref() else {
            return SearchOutcome::exhausted(format!("{} does not support search", provider_id));
        };

        let mirrors = self.mirrors.iterate(provider);
        let mut saw_valid_page = false;
        for (i, mirror) in mirrors.iter().enumerate() {
            let attempt = timeout(
                self.config.attempt_timeout(),
                self.try_search_mirror(provider, table, &mirror.base, query),
            )
            .await
            .unwrap_or_else(|_| Err(ResolveError::Network("attempt timed out".into())));

            match attempt {
                Ok(results) if !results.is_empty() => {
                    self.mirrors.mark_good(&provider.id, &mirror.base);
                    log::info!(
                        "[{}] search {:?}: {} result(s) via {}",
                        provider.id,
                        query,
                        results.len(),
                        mirror.base
                    );
                    return SearchOutcome::found(results);
                }
                Ok(_) => {
                    // a real, unblocked page with zero hits is an answer,
                    // not a failure; remember it so we do not guess
                    saw_valid_page = true;
                    log::debug!("[{}] search empty on {}", provider.id, mirror.base);
                }
                Err(e) => {
                    log::warn!("[{}] search attempt on {} failed: {}", provider.id, mirror.base, e);
                }
            }
            self.pause_between_attempts(i, mirrors.len()).await;
        }

        if saw_valid_page {
            return SearchOutcome::found(Vec::new());
        }

        if table.allow_guess {
            let guess_id = slugify(query);
            if !guess_id.is_empty() {
                log::info!("[{}] search blocked, synthesizing id {:?}", provider.id, guess_id);
                return SearchOutcome::found(vec![SearchResult {
                    id: guess_id,
                    title: query.trim().to_string(),
                    image: None,
                    release: Some(table.guess_release_label.clone()),
                    guessed: true,
                }]);
            }
        }

        SearchOutcome::exhausted(format!("[{}] search failed on every mirror", provider.id))
    }

    /// Fetch series metadata and the full episode list from one provider.
    pub async fn resolve_info(&self, provider_id: &str, series_id: &str) -> InfoOutcome {
        let Some(provider) = self.registry.get(provider_id) else {
            return InfoOutcome::exhausted(format!("unknown provider {:?}", provider_id));
        };
        let Some(table) = provider.info.as_ref() else {
            return InfoOutcome::exhausted(format!("{} does not support info", provider_id));
        };

        let mirrors = self.mirrors.iterate(provider);
        for (i, mirror) in mirrors.iter().enumerate() {
            let attempt = timeout(
                self.config.attempt_timeout(),
                self.try_info_mirror(provider, table, &mirror.base, series_id),
            )
            .await
            .unwrap_or_else(|_| Err(ResolveError::Network("attempt timed out".into())));

            match attempt {
                Ok(info) => {
                    self.mirrors.mark_good(&provider.id, &mirror.base);
                    log::info!(
                        "[{}] info {:?}: {} episode(s) via {}",
                        provider.id,
                        series_id,
                        info.episodes.len(),
                        mirror.base
                    );
                    return InfoOutcome::found(info);
                }
                Err(e) => {
                    log::warn!("[{}] info attempt on {} failed: {}", provider.id, mirror.base, e);
                }
            }
            self.pause_between_attempts(i, mirrors.len()).await;
        }

        InfoOutcome::exhausted(format!(
            "[{}] info for {:?} failed on every mirror",
            provider.id, series_id
        ))
    }

    /// Resolve playable stream sources for one episode.
    pub async fn resolve_sources(&self, provider_id: &str, episode_id: &str) -> SourcesOutcome {
        let Some(provider) = self.registry.get(provider_id) else {
            return SourcesOutcome::exhausted(format!("unknown provider {:?}", provider_id));
        };
        let Some(table) = provider.watch.as_ref() else {
            return SourcesOutcome::exhausted(format!("{} does not support watch", provider_id));
        };

        let mirrors = self.mirrors.iterate(provider);
        for (i, mirror) in mirrors.iter().enumerate() {
            let attempt = timeout(
                self.config.attempt_timeout(),
                self.try_watch_mirror(provider, table, &mirror.base, episode_id),
            )
            .await
            .unwrap_or_else(|_| Err(ResolveError::Network("attempt timed out".into())));

            match attempt {
                Ok(source) => {
                    self.mirrors.mark_good(&provider.id, &mirror.base);
                    log::info!(
                        "[{}] watch {:?}: {} ({}) via {}",
                        provider.id,
                        episode_id,
                        source.url,
                        source.quality,
                        mirror.base
                    );
                    return SourcesOutcome::found(vec![source]);
                }
                Err(e) => {
                    log::warn!("[{}] watch attempt on {} failed: {}", provider.id, mirror.base, e);
                }
            }
            self.pause_between_attempts(i, mirrors.len()).await;
        }

        SourcesOutcome::exhausted(format!(
            "[{}] no stream found for {:?} on any mirror",
            provider.id, episode_id
        ))
    }

    /// Search across every search-capable provider in registry priority
    /// order; first non-empty outcome wins.
    pub async fn resolve_search_any(&self, query: &str) -> SearchOutcome {
        for provider in self.registry.iter().filter(|p| p.capabilities.search) {
            let outcome = self.resolve_search(&provider.id, query).await;
            if !outcome.is_empty() {
                return outcome;
            }
        }
        SearchOutcome::exhausted("no provider returned search results")
    }

    pub async fn resolve_info_any(&self, series_id: &str) -> InfoOutcome {
        for provider in self.registry.iter().filter(|p| p.capabilities.info) {
            let outcome = self.resolve_info(&provider.id, series_id).await;
            if !outcome.is_empty() {
                return outcome;
            }
        }
        InfoOutcome::exhausted("no provider returned series info")
    }

    pub async fn resolve_sources_any(&self, episode_id: &str) -> SourcesOutcome {
        for provider in self.registry.iter().filter(|p| p.capabilities.watch) {
            let outcome = self.resolve_sources(&provider.id, episode_id).await;
            if !outcome.is_empty() {
                return outcome;
            }
        }
        SourcesOutcome::exhausted("no provider returned stream sources")
    }

    /// Re-fetch a resolved media URL with playback headers and rewrite
    /// segmented manifests so their segment lines resolve absolutely.
    pub async fn relay(&self, media_url: &str) -> Option<RelayedStream> {
        relay::relay(self.client.raw_client(), &self.registry, &self.config, media_url).await
    }

    async fn try_search_mirror(
        &self,
        provider: &Provider,
        table: &SearchTable,
        base: &str,
        query: &str,
    ) -> Result<Vec<SearchResult>, ResolveError> {
        let url = table
            .url_template
            .replace("{base}", base)
            .replace("{query}", &urlencoding::encode(query));

        let opts = FetchOptions { referer: None, profile: Some(provider.header_profile.clone()) };
        let body = self
            .client
            .fetch(&url, &opts)
            .await
            .ok_or_else(|| ResolveError::Network(format!("unreachable: {}", url)))?;
        if !validate::is_valid(&body, &table.marker) {
            return Err(ResolveError::Blocked(format!("block page from {}", url)));
        }
        Ok(extract::parse_search_results(&body, table, base))
    }

    async fn try_info_mirror(
        &self,
        provider: &Provider,
        table: &InfoTable,
        base: &str,
        series_id: &str,
    ) -> Result<SeriesInfo, ResolveError> {
        let url = table.url_template.replace("{base}", base).replace("{id}", series_id);

        let opts = FetchOptions { referer: None, profile: Some(provider.header_profile.clone()) };
        let body = self
            .client
            .fetch(&url, &opts)
            .await
            .ok_or_else(|| ResolveError::Network(format!("unreachable: {}", url)))?;
        if !validate::is_valid(&body, &table.marker) {
            return Err(ResolveError::Blocked(format!("block page from {}", url)));
        }
        let anchors = extract::parse_series_page(&body, table, base)
            .ok_or_else(|| ResolveError::Parse(format!("required anchors missing in {}", url)))?;

        // The episode list is served by separate endpoints addressed by the
        // anchor tokens; several hosts carry it, first non-empty list wins.
        for endpoint in &table.episode_endpoints {
            let list_url = endpoint
                .replace("{base}", base)
                .replace("{id}", series_id)
                .replace("{movie_id}", &anchors.internal_id)
                .replace("{alias}", &anchors.alias)
                .replace("{ep_end}", &anchors.ep_end);

            let opts = FetchOptions {
                referer: Some(base.to_string()),
                profile: Some(provider.header_profile.clone()),
            };
            let Some(list_body) = self.client.fetch(&list_url, &opts).await else {
                log::debug!("[{}] episode endpoint unreachable: {}", provider.id, list_url);
                continue;
            };
            if list_body.contains(&table.redirect_marker) {
                log::debug!("[{}] episode endpoint bounced: {}", provider.id, list_url);
                continue;
            }
            let episodes = extract::parse_episode_list(&list_body, table, series_id);
            if episodes.is_empty() {
                continue;
            }
            return Ok(SeriesInfo {
                id: series_id.to_string(),
                title: anchors.title.clone().unwrap_or_else(|| series_id.to_string()),
                image: anchors.image.clone(),
                description: anchors.description.clone(),
                episodes,
            });
        }

        Err(ResolveError::Parse(format!(
            "no episode list for {:?} via {}",
            series_id, base
        )))
    }

    async fn try_watch_mirror(
        &self,
        provider: &Provider,
        table: &WatchTable,
        base: &str,
        episode_id: &str,
    ) -> Result<StreamSource, ResolveError> {
        let url = table.url_template.replace("{base}", base).replace("{episode_id}", episode_id);

        let opts = FetchOptions { referer: None, profile: Some(provider.header_profile.clone()) };
        let body = self
            .client
            .fetch(&url, &opts)
            .await
            .ok_or_else(|| ResolveError::Network(format!("unreachable: {}", url)))?;

        let user_agent = self
            .config
            .profile(&provider.header_profile)
            .user_agents
            .first()
            .cloned()
            .unwrap_or_default();

        match stream::extract_stream(
            &self.client,
            table,
            &body,
            &url,
            base,
            &provider.header_profile,
            &user_agent,
        )
        .await
        {
            Extraction::Stream(source) | Extraction::EmbedOnly(source) => Ok(source),
            Extraction::Exhausted => Err(ResolveError::Parse(format!(
                "no embed yielded a stream for {:?} via {}",
                episode_id, base
            ))),
        }
    }

    async fn pause_between_attempts(&self, index: usize, total: usize) {
        if index + 1 < total && self.config.rate_limit_delay_ms > 0 {
            sleep(Duration::from_millis(self.config.rate_limit_delay_ms)).await;
        }
    }
}
