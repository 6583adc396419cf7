//! Screens fetched bodies that came back 2xx but are semantically useless:
//! challenge interstitials, WAF block pages, empty shells.

use scraper::{Html, Selector};

/// What a page must contain to count as real content.
#[derive(Debug, Clone)]
pub enum Marker {
    /// A required substring anywhere in the body.
    Substring(String),
    /// A CSS selector that must match at least one element.
    Anchor(String),
}

impl Marker {
    pub fn substring(s: impl Into<String>) -> Self {
        Marker::Substring(s.into())
    }

    pub fn anchor(s: impl Into<String>) -> Self {
        Marker::Anchor(s.into())
    }
}

/// True when the body is non-empty and carries the expected marker.
pub fn is_valid(body: &str, marker: &Marker) -> bool {
    if body.trim().is_empty() {
        return false;
    }
    match marker {
        Marker::Substring(s) => body.contains(s.as_str()),
        Marker::Anchor(sel) => {
            let parsed = match Selector::parse(sel) {
                Ok(p) => p,
                Err(_) => {
                    log::warn!("unparseable anchor selector {:?}", sel);
                    return false;
                }
            };
            Html::parse_document(body).select(&parsed).next().is_some()
        }
    }
}

/// True when the body matches a known challenge signature.
pub fn contains_challenge(body: &str, signatures: &[String]) -> bool {
    signatures.iter().any(|sig| body.contains(sig.as_str()))
}
