//! Strategy tables for the gogoanime family of mirrors.
//!
//! The episode list does not live in the series page; it is served by a
//! separate ajax endpoint addressed by the hidden `#movie_id` / `#alias_anime`
//! tokens. Several ajax hosts serve the same list, so they are all declared
//! and tried in order. Player pages embed the stream behind a per-episode
//! video id that the canonical embtaku player accepts directly.

use super::{
    Capabilities, EmbedSelector, InfoTable, Mirror, Provider, SearchTable, WatchTable,
};
use crate::validate::Marker;

pub const ID: &str = "gogoanime";

pub fn provider() -> Provider {
    Provider {
        id: ID.to_string(),
        capabilities: Capabilities { search: true, info: true, watch: true },
        mirrors: vec![
            Mirror { base: "https://anitaku.pe".to_string(), priority: 0 },
            Mirror { base: "https://gogoanimes.fi".to_string(), priority: 1 },
            Mirror { base: "https://gogoanime3.co".to_string(), priority: 2 },
        ],
        header_profile: "desktop".to_string(),
        playback_referer: Some("https://gogoanimes.fi/".to_string()),
        hosts: vec![
            "gogocdn".to_string(),
            "gogoanime".to_string(),
            "anitaku".to_string(),
            "embtaku".to_string(),
            "gogo-load".to_string(),
        ],
        search: Some(SearchTable {
            url_template: "{base}/search.html?keyword={query}".to_string(),
            marker: Marker::anchor("ul.items"),
            item_selector: "ul.items li".to_string(),
            title_selector: "p.name a".to_string(),
            link_selector: "p.name a".to_string(),
            link_strip_prefix: "/category/".to_string(),
            image_selector: "div.img img".to_string(),
            release_selector: "p.released".to_string(),
            allow_guess: true,
            guess_release_label: "Gogo Only".to_string(),
        }),
        info: Some(InfoTable {
            url_template: "{base}/category/{id}".to_string(),
            marker: Marker::anchor("#movie_id"),
            title_selector: "div.anime_info_body_bg h1".to_string(),
            image_selector: "div.anime_info_body_bg img".to_string(),
            description_selector: "div.description".to_string(),
            internal_id_selector: "#movie_id".to_string(),
            alias_selector: "#alias_anime".to_string(),
            ep_end_selector: "#episode_page a".to_string(),
            ep_end_attr: "ep_end".to_string(),
            ep_end_default: "2000".to_string(),
            episode_endpoints: vec![
                "{base}/ajax/load-list-episode?ep_start=0&ep_end={ep_end}&id={movie_id}&default_ep=0&alias={alias}".to_string(),
                "https://ajax.gogo-load.com/ajax/load-list-episode?ep_start=0&ep_end={ep_end}&id={movie_id}&default_ep=0&alias={alias}".to_string(),
                "https://ajax.gogocdn.net/ajax/load-list-episode?ep_start=0&ep_end={ep_end}&id={movie_id}&default_ep=0&alias={alias}".to_string(),
            ],
            episode_item_selector: "li".to_string(),
            episode_link_selector: "a".to_string(),
            episode_name_selector: ".name".to_string(),
            episode_name_prefix: "EP ".to_string(),
            redirect_marker: "Redirecting".to_string(),
        }),
        watch: Some(WatchTable {
            url_template: "{base}/{episode_id}".to_string(),
            embed_selectors: vec![
                // preferred named server slot first, generic frame last
                EmbedSelector { selector: "li.vidcdn a".to_string(), attr: "data-video".to_string() },
                EmbedSelector { selector: "iframe".to_string(), attr: "src".to_string() },
            ],
            embed_id_pattern: Some(r"[?&]id=([^&]+)".to_string()),
            canonical_embed_template: Some(
                "https://embtaku.pro/streaming.php?id={id}".to_string(),
            ),
            file_pattern: r#"file:\s*['"]([^'"]+\.m3u8)['"]"#.to_string(),
            source_list_pattern: r#"(?s)sources:\s*(\[\{.*?\}\])"#.to_string(),
            bare_url_pattern: r#"https?://[^\s"'<>\\]+\.(?:m3u8|mp4|mpd)(?:\?[^\s"'<>\\]*)?"#
                .to_string(),
            require_playback_headers: true,
        }),
    }
}
