use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Resolver-wide configuration.
///
/// Everything here is tunable data that upstream sites force to change
/// without notice: relay endpoints, challenge signatures, header profiles.
/// Loaded from `resolver.toml` when present, otherwise defaults.
#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Budget for one whole mirror attempt (fetch + tunnels + parse).
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Relay endpoints that reissue a GET from a different apparent origin.
    /// Tried in order after the direct request fails.
    #[serde(default = "default_relay_endpoints")]
    pub relay_endpoints: Vec<String>,

    /// Substrings that mark a body as a bot-challenge page.
    #[serde(default = "default_challenge_signatures")]
    pub challenge_signatures: Vec<String>,

    /// Bodies shorter than this are treated as failed attempts.
    #[serde(default = "default_min_body_len")]
    pub min_body_len: usize,

    /// Delay between consecutive mirror attempts, to go easy on fragile
    /// upstreams.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_delay_ms: u64,

    /// Named header profiles, selected per provider.
    #[serde(default = "default_header_profiles")]
    pub header_profiles: HashMap<String, HeaderProfile>,
}

/// A spoofed-browser identity: a user-agent pool plus a default referer.
#[derive(Debug, Deserialize, Clone)]
pub struct HeaderProfile {
    pub user_agents: Vec<String>,
    #[serde(default)]
    pub referer: Option<String>,
}

fn default_timeout() -> u64 {
    15
}
fn default_attempt_timeout() -> u64 {
    45
}
fn default_min_body_len() -> usize {
    64
}
fn default_rate_limit() -> u64 {
    200
}

fn default_relay_endpoints() -> Vec<String> {
    vec!["https://anime-proxyc.sudeepb9880.workers.dev".to_string()]
}

fn default_challenge_signatures() -> Vec<String> {
    [
        "WAF",
        "Verify",
        "Just a moment",
        "cf-browser-verification",
        "Attention Required",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_header_profiles() -> HashMap<String, HeaderProfile> {
    let mut profiles = HashMap::new();
    profiles.insert(
        "desktop".to_string(),
        HeaderProfile {
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            ],
            referer: None,
        },
    );
    profiles
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            attempt_timeout_secs: default_attempt_timeout(),
            relay_endpoints: default_relay_endpoints(),
            challenge_signatures: default_challenge_signatures(),
            min_body_len: default_min_body_len(),
            rate_limit_delay_ms: default_rate_limit(),
            header_profiles: default_header_profiles(),
        }
    }
}

impl ResolverConfig {
    /// Load from `resolver.toml` in the working directory. A missing or
    /// malformed file falls back to defaults; loading never errors.
    pub fn load() -> Self {
        Self::load_from("resolver.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match toml::from_str::<ResolverConfig>(&content) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("ignoring malformed {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Look up a header profile by name, falling back to `desktop`, then to
    /// a single hardcoded identity if the config file dropped both.
    pub fn profile(&self, name: &str) -> HeaderProfile {
        self.header_profiles
            .get(name)
            .or_else(|| self.header_profiles.get("desktop"))
            .cloned()
            .unwrap_or_else(|| HeaderProfile {
                user_agents: vec![
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                ],
                referer: None,
            })
    }
}
