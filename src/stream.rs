//! Turns an episode page into a playable stream.
//!
//! The extraction runs as a small state machine:
//! `RawPage -> EmbedCandidates -> PlayerPageFetched -> StreamFound | Exhausted`.
//! Embed candidates are discovered by a prioritized selector list, each
//! candidate's player page is fetched with the origin page as referer, and a
//! fixed-priority strategy ladder is applied to the player body. The first
//! match anywhere is terminal. If nothing extracts but a playable embed page
//! was located, that page itself is returned as a lowest-quality iframe
//! source. Best effort beats a hard failure here.

use crate::helpers::{ensure_absolute, is_segmented_url, quality_rank};
use crate::http_client::{FetchOptions, ShieldedClient};
use crate::models::StreamSource;
use crate::providers::WatchTable;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;

/// Terminal result of one episode-page extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A stream URL was isolated from a player body.
    Stream(StreamSource),
    /// No stream URL, but a reachable embed page, returned as an
    /// `iframe`-quality source.
    EmbedOnly(StreamSource),
    /// No embed candidate yielded anything; try the next mirror.
    Exhausted,
}

/// Discover embed-candidate URLs in an episode page, in selector priority
/// order, deduplicated, protocol-relative forms normalized to absolute.
pub fn discover_embeds(html: &str, table: &WatchTable, page_base: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut candidates: Vec<String> = Vec::new();
    for embed in &table.embed_selectors {
        let parsed = match Selector::parse(&embed.selector) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("unparseable embed selector {:?}: {}", embed.selector, e);
                continue;
            }
        };
        for el in doc.select(&parsed) {
            if let Some(src) = el.value().attr(&embed.attr) {
                let url = ensure_absolute(src, page_base);
                if !url.is_empty() && !candidates.contains(&url) {
                    candidates.push(url);
                }
            }
        }
    }
    candidates
}

/// Rewrite a candidate to the canonical player URL when the table knows how
/// to pull the video id out of it. Candidates without a recognizable id are
/// used as-is.
pub fn canonicalize_embed(candidate: &str, table: &WatchTable) -> String {
    let (Some(pattern), Some(template)) =
        (table.embed_id_pattern.as_deref(), table.canonical_embed_template.as_deref())
    else {
        return candidate.to_string();
    };
    let re = match Regex::new(pattern) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("bad embed id pattern {:?}: {}", pattern, e);
            return candidate.to_string();
        }
    };
    match re.captures(candidate).and_then(|c| c.get(1)) {
        Some(id) => template.replace("{id}", id.as_str()),
        None => candidate.to_string(),
    }
}

/// Apply the extraction strategies to a player body in fixed priority:
/// (a) direct key/value file pattern, (b) structured multi-source list with
/// the best-labeled entry, (c) any bare playable-media URL. First match wins.
pub fn extract_from_player(body: &str, table: &WatchTable) -> Option<(String, String)> {
    // (a) direct file pattern
    if let Ok(re) = Regex::new(&table.file_pattern) {
        if let Some(url) = re.captures(body).and_then(|c| c.get(1)) {
            return Some((url.as_str().to_string(), "default".to_string()));
        }
    }

    // (b) structured multi-source list: pick the entry with the highest
    // resolution label, else the first
    if let Ok(re) = Regex::new(&table.source_list_pattern) {
        if let Some(blob) = re.captures(body).and_then(|c| c.get(1)) {
            if let Some(found) = best_entry_in_source_list(blob.as_str()) {
                return Some(found);
            }
        }
    }

    // (c) bare absolute media URL
    if let Ok(re) = Regex::new(&table.bare_url_pattern) {
        if let Some(m) = re.find(body) {
            return Some((m.as_str().to_string(), "default".to_string()));
        }
    }

    None
}

/// The source-list blob is JavaScript, not strict JSON, so entries are
/// walked with a tolerant pattern instead of a JSON parser.
fn best_entry_in_source_list(blob: &str) -> Option<(String, String)> {
    let entry_re =
        Regex::new(r#"file:\s*['"]([^'"]+)['"](?:\s*,\s*label:\s*['"]([^'"]+)['"])?"#).ok()?;
    let mut best: Option<(String, String, u32)> = None;
    for caps in entry_re.captures_iter(blob) {
        let url = caps.get(1)?.as_str().to_string();
        let label = caps.get(2).map(|m| m.as_str().to_string());
        let rank = label.as_deref().map(quality_rank).unwrap_or(0);
        let quality = label.unwrap_or_else(|| "default".to_string());
        match &best {
            Some((_, _, best_rank)) if *best_rank >= rank => {}
            _ => best = Some((url, quality, rank)),
        }
    }
    best.map(|(url, quality, _)| (url, quality))
}

fn playback_headers(
    table: &WatchTable,
    referer: &str,
    user_agent: &str,
) -> Option<HashMap<String, String>> {
    if !table.require_playback_headers {
        return None;
    }
    let mut headers = HashMap::new();
    headers.insert("Referer".to_string(), referer.to_string());
    headers.insert("User-Agent".to_string(), user_agent.to_string());
    Some(headers)
}

/// Run the full extraction over an already-fetched episode page.
///
/// `origin` is the episode page URL; it is presented as referer to every
/// player fetch. Candidates are tried in priority order and the first
/// strategy hit is terminal; remaining candidates are abandoned.
pub async fn extract_stream(
    client: &ShieldedClient,
    table: &WatchTable,
    episode_html: &str,
    origin: &str,
    mirror_base: &str,
    profile: &str,
    user_agent: &str,
) -> Extraction {
    let candidates = discover_embeds(episode_html, table, mirror_base);
    if candidates.is_empty() {
        log::debug!("no embed candidates in {}", origin);
        return Extraction::Exhausted;
    }
    log::debug!("{} embed candidate(s) in {}", candidates.len(), origin);

    // first player page that fetched fine but yielded no stream, kept for
    // the degradation path
    let mut reachable_embed: Option<String> = None;

    for candidate in candidates {
        let player_url = canonicalize_embed(&candidate, table);
        let opts = FetchOptions {
            referer: Some(origin.to_string()),
            profile: Some(profile.to_string()),
        };
        let Some(player_body) = client.fetch(&player_url, &opts).await else {
            log::debug!("player page unreachable: {}", player_url);
            continue;
        };

        if let Some((url, quality)) = extract_from_player(&player_body, table) {
            let url = ensure_absolute(&url, mirror_base);
            log::info!("stream found via {}: {}", player_url, url);
            return Extraction::Stream(StreamSource {
                is_segmented: is_segmented_url(&url),
                headers: playback_headers(table, &player_url, user_agent),
                url,
                quality,
            });
        }

        if reachable_embed.is_none() {
            reachable_embed = Some(player_url);
        }
    }

    if let Some(embed_url) = reachable_embed {
        log::warn!("extraction failed, degrading to embed page {}", embed_url);
        return Extraction::EmbedOnly(StreamSource {
            url: embed_url,
            quality: "iframe".to_string(),
            is_segmented: false,
            headers: None,
        });
    }

    Extraction::Exhausted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::gogoanime;

    fn watch_table() -> WatchTable {
        gogoanime::provider().watch.unwrap()
    }

    #[test]
    fn embeds_discovered_in_priority_order_and_deduped() {
        let html = r##"<html><body>
            <iframe src="//playtaku.net/streaming.php?id=MTIzNDU=&title=x"></iframe>
            <ul>
                <li class="vidcdn"><a data-video="https://playtaku.net/streaming.php?id=MTIzNDU=&title=x" href="#">Vidstreaming</a></li>
                <li class="doodstream"><a data-video="https://dood.example/e/abc" href="#">Doodstream</a></li>
            </ul>
        </body></html>"##;
        let candidates = discover_embeds(html, &watch_table(), "https://anitaku.pe");
        // vidcdn slot wins priority; the iframe duplicate is dropped
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0], "https://playtaku.net/streaming.php?id=MTIzNDU=&title=x");
    }

    #[test]
    fn protocol_relative_embeds_become_absolute() {
        let html = r#"<iframe src="//embtaku.pro/streaming.php?id=xyz"></iframe>"#;
        let candidates = discover_embeds(html, &watch_table(), "https://anitaku.pe");
        assert_eq!(candidates, vec!["https://embtaku.pro/streaming.php?id=xyz"]);
    }

    #[test]
    fn canonicalize_rewrites_by_video_id() {
        let table = watch_table();
        assert_eq!(
            canonicalize_embed("https://playtaku.net/streaming.php?id=MTIzNDU=&title=naruto", &table),
            "https://embtaku.pro/streaming.php?id=MTIzNDU="
        );
        // no id parameter: candidate used as-is
        assert_eq!(
            canonicalize_embed("https://dood.example/e/abc", &table),
            "https://dood.example/e/abc"
        );
    }

    #[test]
    fn direct_file_pattern_beats_bare_url() {
        let body = r#"
            <script>
            playerInstance.setup({
                file: 'https://cdn.example/ep1/master.m3u8',
            });
            </script>
            <a href="https://other.example/fallback.mp4">download</a>
        "#;
        let (url, quality) = extract_from_player(body, &watch_table()).unwrap();
        assert_eq!(url, "https://cdn.example/ep1/master.m3u8");
        assert_eq!(quality, "default");
    }

    #[test]
    fn source_list_picks_highest_resolution() {
        let body = r#"
            <script>
            jwplayer().setup({
                sources: [{file: "https://cdn.example/360.mp4", label: "360 P"},
                          {file: "https://cdn.example/1080.mp4", label: "1080 P"},
                          {file: "https://cdn.example/720.mp4", label: "720 P"}],
            });
            </script>
        "#;
        let (url, quality) = extract_from_player(body, &watch_table()).unwrap();
        assert_eq!(url, "https://cdn.example/1080.mp4");
        assert_eq!(quality, "1080 P");
    }

    #[test]
    fn unlabeled_source_list_takes_first_entry() {
        let body = r#"sources: [{file: "https://cdn.example/a.mp4"}, {file: "https://cdn.example/b.mp4"}]"#;
        let (url, _) = extract_from_player(body, &watch_table()).unwrap();
        assert_eq!(url, "https://cdn.example/a.mp4");
    }

    #[test]
    fn bare_url_is_the_last_resort() {
        let body = r#"<video><source src="https://cdn.example/raw/episode.mp4?tok=5"></video>"#;
        let (url, _) = extract_from_player(body, &watch_table()).unwrap();
        assert_eq!(url, "https://cdn.example/raw/episode.mp4?tok=5");
    }

    #[test]
    fn nothing_playable_yields_none() {
        assert!(extract_from_player("<html>nothing here</html>", &watch_table()).is_none());
    }
}
