//! Re-fetches a resolved media URL on behalf of a player that cannot send
//! the required headers itself, and fixes up segmented-playlist manifests so
//! the player's follow-up segment requests resolve correctly.

use crate::config::ResolverConfig;
use crate::helpers::looks_like_page;
use crate::providers::ProviderRegistry;
use reqwest::{Client, Url};

pub const DEFAULT_MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// A relayed media payload, ready to forward to the caller.
#[derive(Debug, Clone)]
pub struct RelayedStream {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Fetch `media_url` with the referer/user-agent the owning provider's CDN
/// expects, rewriting manifests on the way through. `None` on refusal or
/// fetch failure; the relay never errors.
pub async fn relay(
    client: &Client,
    registry: &ProviderRegistry,
    config: &ResolverConfig,
    media_url: &str,
) -> Option<RelayedStream> {
    let url = match Url::parse(media_url) {
        Ok(u) => u,
        Err(e) => {
            log::warn!("refusing to relay unparseable url {:?}: {}", media_url, e);
            return None;
        }
    };
    if looks_like_page(media_url) {
        log::warn!("refusing to relay page-like url {}", media_url);
        return None;
    }

    let referer = url
        .host_str()
        .and_then(|host| registry.referer_for_host(host))
        .map(|r| r.to_string());
    let user_agent = config
        .profile("desktop")
        .user_agents
        .first()
        .cloned()
        .unwrap_or_default();

    let mut request = client.get(url.clone()).header("User-Agent", user_agent);
    if let Some(r) = &referer {
        request = request.header("Referer", r);
    }

    let response = match request.send().await {
        Ok(r) => r,
        Err(e) => {
            log::warn!("relay fetch failed for {}: {}", media_url, e);
            return None;
        }
    };
    if !response.status().is_success() {
        log::warn!("relay fetch for {} returned {}", media_url, response.status());
        return None;
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_MANIFEST_CONTENT_TYPE)
        .to_string();

    let bytes = response.bytes().await.ok()?;

    if is_manifest(&url, &content_type, &bytes) {
        let text = String::from_utf8_lossy(&bytes);
        let rewritten = rewrite_manifest(&text, &url);
        return Some(RelayedStream {
            content_type: DEFAULT_MANIFEST_CONTENT_TYPE.to_string(),
            body: rewritten.into_bytes(),
        });
    }

    Some(RelayedStream { content_type, body: bytes.to_vec() })
}

fn is_manifest(url: &Url, content_type: &str, body: &[u8]) -> bool {
    url.path().to_lowercase().ends_with(".m3u8")
        || content_type.contains("mpegurl")
        || body.starts_with(b"#EXTM3U")
}

/// Rewrite every non-comment, non-absolute line of a playlist to an
/// absolute URL rooted at the manifest's own directory. `#` lines (tags and
/// comments) and already-absolute lines pass through untouched.
pub fn rewrite_manifest(body: &str, manifest_url: &Url) -> String {
    body.lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed.starts_with("http://")
                || trimmed.starts_with("https://")
            {
                return line.to_string();
            }
            match manifest_url.join(trimmed) {
                Ok(abs) => abs.to_string(),
                Err(e) => {
                    log::warn!("manifest line {:?} did not join: {}", trimmed, e);
                    line.to_string()
                }
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
