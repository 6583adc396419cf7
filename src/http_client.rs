use crate::config::ResolverConfig;
use crate::models::{AttemptOutcome, FetchAttempt, FetchPath};
use crate::validate;
use rand::Rng;
use reqwest::{Client, ClientBuilder, Url};
use std::time::Duration;

/// Per-request options for a shielded fetch.
#[derive(Debug, Default, Clone)]
pub struct FetchOptions {
    /// Referer to present upstream. Falls back to the header profile's
    /// default referer when unset.
    pub referer: Option<String>,
    /// Header-profile name from the config; `desktop` when unset.
    pub profile: Option<String>,
}

/// HTTP client that performs one logical GET behind anti-bot shielding.
///
/// The direct request goes out first with spoofed browser headers; on a
/// non-2xx status, a transport failure, a challenge body or an implausibly
/// short body it retries sequentially through the configured relay tunnels,
/// each reissuing the identical request from a different apparent origin.
/// The first plausible 2xx body wins. Total failure returns `None`;
/// failure is data here, never an error.
pub struct ShieldedClient {
    client: Client,
    config: ResolverConfig,
}

impl ShieldedClient {
    pub fn new(config: ResolverConfig) -> Result<Self, reqwest::Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8".parse().unwrap());
        headers.insert("Accept-Language", "en-US,en;q=0.9".parse().unwrap());
        headers.insert("DNT", "1".parse().unwrap());
        headers.insert("Upgrade-Insecure-Requests", "1".parse().unwrap());
        headers.insert("Sec-Fetch-Dest", "document".parse().unwrap());
        headers.insert("Sec-Fetch-Mode", "navigate".parse().unwrap());
        headers.insert("Sec-Fetch-Site", "none".parse().unwrap());

        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// The underlying client, for callers that need an unshielded GET
    /// (the stream relay fetches media bytes directly).
    pub fn raw_client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn pick_user_agent(&self, profile: &str) -> String {
        let pool = self.config.profile(profile).user_agents;
        if pool.is_empty() {
            return "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string();
        }
        let idx = rand::thread_rng().gen_range(0..pool.len());
        pool[idx].clone()
    }

    /// Perform one logical GET. Returns the first plausible body, or `None`
    /// once the direct path and every tunnel have failed.
    pub async fn fetch(&self, url: &str, opts: &FetchOptions) -> Option<String> {
        let profile_name = opts.profile.as_deref().unwrap_or("desktop");
        let profile = self.config.profile(profile_name);
        let referer = opts
            .referer
            .clone()
            .or(profile.referer.clone());

        let mut attempts: Vec<FetchAttempt> = Vec::new();

        let direct = self
            .attempt(url, FetchPath::Direct, url, referer.as_deref(), profile_name)
            .await;
        match direct {
            Ok(body) => {
                attempts.push(FetchAttempt {
                    url: url.to_string(),
                    path: FetchPath::Direct,
                    outcome: AttemptOutcome::Success,
                });
                self.log_attempts(&attempts);
                return Some(body);
            }
            Err(outcome) => {
                log::debug!("direct fetch of {} failed: {:?}", url, outcome);
                attempts.push(FetchAttempt {
                    url: url.to_string(),
                    path: FetchPath::Direct,
                    outcome,
                });
            }
        }

        for (n, endpoint) in self.config.relay_endpoints.iter().enumerate() {
            let Some(tunnel_url) = self.tunnel_url(endpoint, url, referer.as_deref(), profile_name)
            else {
                log::warn!("skipping malformed relay endpoint {:?}", endpoint);
                continue;
            };
            match self
                .attempt(&tunnel_url, FetchPath::Tunnel(n), url, referer.as_deref(), profile_name)
                .await
            {
                Ok(body) => {
                    attempts.push(FetchAttempt {
                        url: url.to_string(),
                        path: FetchPath::Tunnel(n),
                        outcome: AttemptOutcome::Success,
                    });
                    self.log_attempts(&attempts);
                    return Some(body);
                }
                Err(outcome) => {
                    log::debug!("tunnel {} fetch of {} failed: {:?}", n, url, outcome);
                    attempts.push(FetchAttempt {
                        url: url.to_string(),
                        path: FetchPath::Tunnel(n),
                        outcome,
                    });
                }
            }
        }

        self.log_attempts(&attempts);
        None
    }

    /// Build the relay form of the request: the tunnel reissues the GET with
    /// our spoofed headers attached as a JSON blob.
    fn tunnel_url(
        &self,
        endpoint: &str,
        target: &str,
        referer: Option<&str>,
        profile: &str,
    ) -> Option<String> {
        let mut url = Url::parse(endpoint).ok()?;
        let headers = serde_json::json!({
            "User-Agent": self.pick_user_agent(profile),
            "Referer": referer.unwrap_or_default(),
        });
        url.query_pairs_mut()
            .append_pair("url", target)
            .append_pair("headers", &headers.to_string());
        Some(url.to_string())
    }

    async fn attempt(
        &self,
        request_url: &str,
        path: FetchPath,
        logical_url: &str,
        referer: Option<&str>,
        profile: &str,
    ) -> Result<String, AttemptOutcome> {
        let mut request = self
            .client
            .get(request_url)
            .header("User-Agent", self.pick_user_agent(profile));
        // On the direct path the referer goes on the wire; tunnels carry it
        // inside the headers blob instead.
        if path == FetchPath::Direct {
            if let Some(r) = referer {
                request = request.header("Referer", r);
            }
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                log::debug!("transport error for {}: {}", logical_url, e);
                return Err(AttemptOutcome::Transport);
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptOutcome::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(|_| AttemptOutcome::Transport)?;
        if validate::contains_challenge(&body, &self.config.challenge_signatures) {
            return Err(AttemptOutcome::Challenge);
        }
        if body.len() < self.config.min_body_len {
            return Err(AttemptOutcome::TooShort);
        }
        Ok(body)
    }

    fn log_attempts(&self, attempts: &[FetchAttempt]) {
        if let Some(last) = attempts.last() {
            if last.outcome == AttemptOutcome::Success {
                log::debug!(
                    "fetched {} via {:?} after {} attempt(s)",
                    last.url,
                    last.path,
                    attempts.len()
                );
            } else {
                log::warn!(
                    "every path failed for {} ({} attempt(s), last {:?})",
                    last.url,
                    attempts.len(),
                    last.outcome
                );
            }
        }
    }
}
