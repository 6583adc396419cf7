//! Strategy tables for animepahe.
//!
//! Episode ids here are composite `{series-session}/{episode-session}`
//! tokens; the series page carries both in its markup, so the generic
//! repair step (re-prefixing a bare episode fragment with the series id)
//! applies unchanged. No ajax indirection: the episode list is in the
//! series page itself, so the page URL doubles as the only list endpoint.

use super::{
    Capabilities, EmbedSelector, InfoTable, Mirror, Provider, SearchTable, WatchTable,
};
use crate::validate::Marker;

pub const ID: &str = "animepahe";

pub fn provider() -> Provider {
    Provider {
        id: ID.to_string(),
        capabilities: Capabilities { search: true, info: true, watch: true },
        mirrors: vec![
            Mirror { base: "https://animepahe.ru".to_string(), priority: 0 },
            Mirror { base: "https://animepahe.com".to_string(), priority: 1 },
            Mirror { base: "https://animepahe.org".to_string(), priority: 2 },
        ],
        header_profile: "desktop".to_string(),
        playback_referer: Some("https://animepahe.ru/".to_string()),
        hosts: vec!["animepahe".to_string(), "kwik".to_string(), "nextcdn".to_string()],
        search: Some(SearchTable {
            url_template: "{base}/anime?search={query}".to_string(),
            marker: Marker::anchor("div.index-list"),
            item_selector: "div.index-list div.col-item".to_string(),
            title_selector: "a.title".to_string(),
            link_selector: "a.title".to_string(),
            link_strip_prefix: "/anime/".to_string(),
            image_selector: "img".to_string(),
            release_selector: "div.released".to_string(),
            // session-token ids cannot be synthesized from a title
            allow_guess: false,
            guess_release_label: String::new(),
        }),
        info: Some(InfoTable {
            url_template: "{base}/anime/{id}".to_string(),
            marker: Marker::anchor("div.episode-list"),
            title_selector: "div.title-wrapper h1".to_string(),
            image_selector: "div.anime-poster img".to_string(),
            description_selector: "div.anime-synopsis".to_string(),
            internal_id_selector: "#anime-session".to_string(),
            alias_selector: "#anime-slug".to_string(),
            ep_end_selector: "div.episode-list".to_string(),
            ep_end_attr: "data-last".to_string(),
            ep_end_default: "2000".to_string(),
            // episode list lives on the series page itself
            episode_endpoints: vec!["{base}/anime/{id}".to_string()],
            episode_item_selector: "div.episode-list div.episode".to_string(),
            episode_link_selector: "a.play".to_string(),
            episode_name_selector: ".episode-number".to_string(),
            episode_name_prefix: "Episode ".to_string(),
            redirect_marker: "Redirecting".to_string(),
        }),
        watch: Some(WatchTable {
            url_template: "{base}/play/{episode_id}".to_string(),
            embed_selectors: vec![
                EmbedSelector {
                    selector: "button[data-src]".to_string(),
                    attr: "data-src".to_string(),
                },
                EmbedSelector { selector: "iframe".to_string(), attr: "src".to_string() },
            ],
            // kwik embeds are already canonical player URLs
            embed_id_pattern: None,
            canonical_embed_template: None,
            file_pattern: r#"file:\s*['"]([^'"]+\.m3u8)['"]"#.to_string(),
            source_list_pattern: r#"(?s)sources:\s*(\[\{.*?\}\])"#.to_string(),
            bare_url_pattern: r#"https?://[^\s"'<>\\]+\.(?:m3u8|mp4|mpd)(?:\?[^\s"'<>\\]*)?"#
                .to_string(),
            require_playback_headers: true,
        }),
    }
}
