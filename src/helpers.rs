//! Small utilities shared across the resolver:
//! - identifier slug synthesis
//! - URL normalization
//! - quality-label ranking and media-extension checks

use regex::Regex;

/// Turn a free-text query into a candidate provider identifier.
/// Lowercase, collapse every non-alphanumeric run into a single dash,
/// trim leading/trailing dashes.
pub fn slugify(query: &str) -> String {
    let mut slug = String::with_capacity(query.len());
    let mut last_dash = true;
    for c in query.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Normalize a scraped URL to an absolute one.
/// Protocol-relative URLs (`//host/path`) get `https:`; relative paths are
/// joined onto `base`; absolute URLs pass through.
pub fn ensure_absolute(url: &str, base: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    if url.starts_with("//") {
        return format!("https:{}", url);
    }
    format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
}

/// Rank a quality label ("1080p", "HD 720", "360 P") by its resolution
/// number. Labels with no number rank lowest.
pub fn quality_rank(label: &str) -> u32 {
    let re = Regex::new(r"(\d{3,4})").unwrap();
    re.captures(label)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Whether a URL path points at a playable media asset.
pub fn is_media_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.to_lowercase();
    path.ends_with(".m3u8") || path.ends_with(".mp4") || path.ends_with(".mpd") || path.ends_with(".ts")
}

/// Whether a URL path suggests an HTML page rather than a media asset.
pub fn looks_like_page(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.to_lowercase();
    path.ends_with(".html")
        || path.ends_with(".htm")
        || path.ends_with(".php")
        || path.ends_with(".asp")
        || path.ends_with(".aspx")
}

/// Whether a stream URL is a segmented-playlist manifest.
pub fn is_segmented_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.to_lowercase();
    path.ends_with(".m3u8") || path.ends_with(".mpd")
}
