//! End-to-end resolution against mock upstream mirrors: fallback across
//! blocked mirrors, exhaustion-as-data, extraction strategy priority and
//! manifest rewriting, with no traffic leaving the loopback interface.

use rust_anime_resolver::config::ResolverConfig;
use rust_anime_resolver::providers::{
    Capabilities, EmbedSelector, InfoTable, Mirror, Provider, ProviderRegistry, SearchTable,
    WatchTable,
};
use rust_anime_resolver::resolver::Resolver;
use rust_anime_resolver::validate::Marker;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BLOCK_PAGE: &str = "WAF interstitial: access denied. Complete the browser challenge to \
                          continue to the requested page. Reference #4f8a.";

const SERIES_PAGE: &str = r#"<html><body>
    <div class="anime_info_body_bg">
        <img src="/cover/naruto-shippuden.png">
        <h1>Naruto Shippuden</h1>
    </div>
    <div class="description">Long-running ninja sequel.</div>
    <input type="hidden" id="movie_id" value="2345">
    <input type="hidden" id="alias_anime" value="naruto-shippuden">
    <ul id="episode_page"><li><a ep_start="0" ep_end="500">0-500</a></li></ul>
</body></html>"#;

const SEARCH_PAGE: &str = r#"<html><body><ul class="items">
    <li>
        <div class="img"><img src="/img/ns.png"></div>
        <p class="name"><a href="/category/naruto-shippuden">Naruto Shippuden</a></p>
        <p class="released">Released: 2007</p>
    </li>
</ul></body></html>"#;

fn episode_list_page(series_id: &str, count: usize) -> String {
    let mut html = String::from("<ul>");
    for n in (1..=count).rev() {
        html.push_str(&format!(
            r#"<li><a href="/{series_id}-episode-{n}"><div class="name">EP {n}</div></a></li>"#
        ));
    }
    html.push_str("</ul>");
    html
}

fn test_config() -> ResolverConfig {
    ResolverConfig {
        relay_endpoints: Vec::new(),
        rate_limit_delay_ms: 0,
        timeout_secs: 2,
        attempt_timeout_secs: 5,
        ..ResolverConfig::default()
    }
}

/// A gogo-shaped provider whose mirrors point at mock servers. Embed
/// canonicalization is disabled so player fetches stay on the mock host.
fn test_provider(bases: &[String]) -> Provider {
    Provider {
        id: "testprov".to_string(),
        capabilities: Capabilities { search: true, info: true, watch: true },
        mirrors: bases
            .iter()
            .enumerate()
            .map(|(i, b)| Mirror { base: b.clone(), priority: i as u8 })
            .collect(),
        header_profile: "desktop".to_string(),
        playback_referer: Some("https://testprov.example/".to_string()),
        hosts: vec!["cdn.example".to_string()],
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
            guess_release_label: "Catalog guess".to_string(),
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
                "{base}/ajax/load-list-episode?ep_start=0&ep_end={ep_end}&id={movie_id}&default_ep=0&alias={alias}"
                    .to_string(),
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
                EmbedSelector { selector: "li.vidcdn a".to_string(), attr: "data-video".to_string() },
                EmbedSelector { selector: "iframe".to_string(), attr: "src".to_string() },
            ],
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

fn resolver_for(bases: &[String]) -> Resolver {
    let registry = ProviderRegistry::with_providers(vec![test_provider(bases)]);
    Resolver::with(test_config(), registry).expect("resolver construction")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn blocked_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BLOCK_PAGE))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn info_falls_back_past_blocked_mirrors() {
    let blocked = blocked_server().await;
    let good = MockServer::start().await;
    mount_page(&good, "/category/naruto-shippuden", SERIES_PAGE).await;
    mount_page(&good, "/ajax/load-list-episode", &episode_list_page("naruto-shippuden", 5)).await;

    // a mirror after the winning one must never be contacted
    let untouched = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&untouched)
        .await;

    let resolver = resolver_for(&[blocked.uri(), good.uri(), untouched.uri()]);
    let outcome = resolver.resolve_info("testprov", "naruto-shippuden").await;

    let info = outcome.info.expect("resolution should succeed via the second mirror");
    assert_eq!(info.title, "Naruto Shippuden");
    assert_eq!(info.episodes.len(), 5);
    assert_eq!(info.episodes[0].id, "naruto-shippuden-episode-1");
    assert_eq!(info.episodes[0].number, 1.0);
    // strictly increasing after the documented reversal
    assert!(info.episodes.windows(2).all(|w| w[0].number < w[1].number));
}

#[tokio::test]
async fn large_series_reverses_to_ascending_order() {
    let server = MockServer::start().await;
    mount_page(&server, "/category/naruto-shippuden", SERIES_PAGE).await;
    mount_page(&server, "/ajax/load-list-episode", &episode_list_page("naruto-shippuden", 500))
        .await;

    let resolver = resolver_for(&[server.uri()]);
    let info = resolver
        .resolve_info("testprov", "naruto-shippuden")
        .await
        .info
        .expect("info resolves");
    assert_eq!(info.episodes.len(), 500);
    assert_eq!(info.episodes[0].id, "naruto-shippuden-episode-1");
    assert_eq!(info.episodes[0].number, 1.0);
    assert_eq!(info.episodes[499].number, 500.0);
}

#[tokio::test]
async fn exhaustion_is_data_never_a_fault() {
    let blocked_a = blocked_server().await;
    let blocked_b = blocked_server().await;

    let resolver = resolver_for(&[blocked_a.uri(), blocked_b.uri()]);

    let sources = resolver.resolve_sources("testprov", "naruto-shippuden-episode-1").await;
    assert!(sources.sources.is_empty());
    assert!(sources.error.is_some());

    let info = resolver.resolve_info("testprov", "naruto-shippuden").await;
    assert!(info.info.is_none());
    assert!(info.error.is_some());
}

#[tokio::test]
async fn direct_file_pattern_wins_over_bare_url_and_is_idempotent() {
    let server = MockServer::start().await;
    let player_url = format!("{}/player/ep1", server.uri());
    let episode_page = format!(
        r#"<html><body><h2>Episode 1</h2>
        <div class="play-video"><iframe src="{player_url}" allowfullscreen></iframe></div>
        </body></html>"#
    );
    let player_page = r#"<html><body><script>
        playerInstance.setup({ file: 'https://cdn.example/ep1/master.m3u8' });
        </script>
        <a href="https://mirror.example/ep1/fallback.mp4">direct download</a>
    </body></html>"#;
    mount_page(&server, "/naruto-shippuden-episode-1", &episode_page).await;
    mount_page(&server, "/player/ep1", player_page).await;

    let resolver = resolver_for(&[server.uri()]);

    let first = resolver.resolve_sources("testprov", "naruto-shippuden-episode-1").await;
    assert_eq!(first.sources.len(), 1);
    let source = &first.sources[0];
    // the direct key/value pattern beats the bare mp4 URL
    assert_eq!(source.url, "https://cdn.example/ep1/master.m3u8");
    assert!(source.is_segmented);
    let headers = source.headers.as_ref().expect("playback headers required");
    assert_eq!(headers.get("Referer").map(String::as_str), Some(player_url.as_str()));

    // unchanged upstream content resolves to the same URL
    let second = resolver.resolve_sources("testprov", "naruto-shippuden-episode-1").await;
    assert_eq!(second.sources[0].url, first.sources[0].url);
}

#[tokio::test]
async fn unextractable_player_degrades_to_embed_source() {
    let server = MockServer::start().await;
    let player_url = format!("{}/player/ep2", server.uri());
    let episode_page = format!(
        r#"<html><body><iframe src="{player_url}"></iframe>
        <p>episode two of the show, now with padding to look like a page</p></body></html>"#
    );
    let player_page = r#"<html><body>
        <div id="video-holder">nothing machine-readable in here, just a js bundle reference</div>
        <script src="/static/player-bundle.js"></script>
    </body></html>"#;
    mount_page(&server, "/naruto-shippuden-episode-2", &episode_page).await;
    mount_page(&server, "/player/ep2", player_page).await;

    let resolver = resolver_for(&[server.uri()]);
    let outcome = resolver.resolve_sources("testprov", "naruto-shippuden-episode-2").await;

    assert_eq!(outcome.sources.len(), 1);
    assert_eq!(outcome.sources[0].quality, "iframe");
    assert_eq!(outcome.sources[0].url, player_url);
    assert!(!outcome.sources[0].is_segmented);
}

#[tokio::test]
async fn search_scrapes_results_when_reachable() {
    let server = MockServer::start().await;
    mount_page(&server, "/search.html", SEARCH_PAGE).await;

    let resolver = resolver_for(&[server.uri()]);
    let outcome = resolver.resolve_search("testprov", "naruto shippuden").await;

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].id, "naruto-shippuden");
    assert!(!outcome.results[0].guessed);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn blocked_search_synthesizes_a_flagged_identifier() {
    let blocked = blocked_server().await;
    let resolver = resolver_for(&[blocked.uri()]);

    let outcome = resolver.resolve_search("testprov", "Naruto Shippuden").await;
    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.results[0].guessed);
    assert_eq!(outcome.results[0].id, "naruto-shippuden");
    assert_eq!(outcome.results[0].title, "Naruto Shippuden");
    assert_eq!(outcome.results[0].release.as_deref(), Some("Catalog guess"));
}

#[tokio::test]
async fn valid_empty_search_page_means_no_hits_not_a_guess() {
    let server = MockServer::start().await;
    let empty_page = r#"<html><body><ul class="items"></ul>
        <p>No series matched the requested keyword on this catalog page.</p></body></html>"#;
    mount_page(&server, "/search.html", empty_page).await;

    let resolver = resolver_for(&[server.uri()]);
    let outcome = resolver.resolve_search("testprov", "zzzz no such show").await;
    assert!(outcome.results.is_empty());
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn exhausted_provider_falls_through_to_the_next_one() {
    let blocked = blocked_server().await;
    let good = MockServer::start().await;
    mount_page(&good, "/search.html", SEARCH_PAGE).await;

    let mut primary = test_provider(&[blocked.uri()]);
    primary.id = "primary".to_string();
    if let Some(search) = primary.search.as_mut() {
        search.allow_guess = false;
    }
    let mut secondary = test_provider(&[good.uri()]);
    secondary.id = "secondary".to_string();

    let registry = ProviderRegistry::with_providers(vec![primary, secondary]);
    let resolver = Resolver::with(test_config(), registry).expect("resolver construction");

    let outcome = resolver.resolve_search_any("naruto shippuden").await;
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].id, "naruto-shippuden");
    assert!(!outcome.results[0].guessed);
}

#[tokio::test]
async fn relay_rewrites_relative_manifest_lines() {
    let server = MockServer::start().await;
    let manifest = "#EXTM3U\n\
                    #EXT-X-VERSION:3\n\
                    #EXTINF:4.0,\n\
                    seg-001.ts\n\
                    #EXTINF:4.0,\n\
                    seg-002.ts\n\
                    #EXT-X-ENDLIST";
    Mock::given(method("GET"))
        .and(path("/vids/ep1/master.m3u8"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(manifest.as_bytes().to_vec(), "application/vnd.apple.mpegurl"),
        )
        .mount(&server)
        .await;

    let resolver = resolver_for(&[server.uri()]);
    let manifest_url = format!("{}/vids/ep1/master.m3u8", server.uri());
    let relayed = resolver.relay(&manifest_url).await.expect("relay succeeds");

    assert_eq!(relayed.content_type, "application/vnd.apple.mpegurl");
    let text = String::from_utf8(relayed.body).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "#EXTM3U");
    assert_eq!(lines[3], format!("{}/vids/ep1/seg-001.ts", server.uri()));
    assert_eq!(lines[5], format!("{}/vids/ep1/seg-002.ts", server.uri()));
    assert_eq!(lines[6], "#EXT-X-ENDLIST");
}

#[tokio::test]
async fn relay_refuses_page_like_urls() {
    let resolver = resolver_for(&["http://127.0.0.1:9".to_string()]);
    assert!(resolver.relay("http://127.0.0.1:9/watch.html").await.is_none());
}
