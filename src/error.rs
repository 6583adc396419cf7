/// Errors raised inside a single resolution attempt.
///
/// These never cross the public API: the fallback loops catch each one at the
/// attempt boundary, log it and move on to the next mirror or provider. Only
/// `Exhausted` survives to the boundary, and there it is flattened into
/// outcome data (an empty list plus a diagnostic string).
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("network failure: {0}")]
    Network(String),

    /// The response was syntactically fine but semantically a block page
    /// (WAF interstitial, challenge, empty shell). Handled exactly like
    /// `Network` by the fallback loop.
    #[error("blocked by upstream: {0}")]
    Blocked(String),

    /// A required anchor (selector, token, pattern) was missing from an
    /// otherwise valid page.
    #[error("parse failure: {0}")]
    Parse(String),

    #[error("all providers/mirrors/strategies exhausted: {0}")]
    Exhausted(String),
}

impl ResolveError {
    /// Whether the fallback loop should keep trying alternates after this
    /// error. Everything short of exhaustion is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ResolveError::Exhausted(_))
    }
}
