//! Parses validated pages into the data model. All selectors come from the
//! provider's strategy tables; nothing in here is provider-specific.

use crate::helpers::ensure_absolute;
use crate::models::{Episode, SearchResult};
use crate::providers::{InfoTable, SearchTable};
use scraper::{ElementRef, Html, Selector};

/// Anchor fields pulled from a series page. `internal_id` and `alias` are
/// the tokens the episode-list endpoint is addressed by.
#[derive(Debug, Clone)]
pub struct SeriesAnchors {
    pub title: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub internal_id: String,
    pub alias: String,
    pub ep_end: String,
}

fn sel(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(s) => Some(s),
        Err(e) => {
            log::warn!("unparseable selector {:?}: {}", raw, e);
            None
        }
    }
}

fn text_of(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(scope: &ElementRef, selector: &Selector) -> Option<String> {
    scope.select(selector).next().map(|el| text_of(&el)).filter(|t| !t.is_empty())
}

fn first_attr(scope: &ElementRef, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a provider search page. Possibly empty; items without a usable id
/// are dropped rather than returned half-formed.
pub fn parse_search_results(html: &str, table: &SearchTable, base: &str) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);
    let (Some(item_sel), Some(title_sel), Some(link_sel)) = (
        sel(&table.item_selector),
        sel(&table.title_selector),
        sel(&table.link_selector),
    ) else {
        return Vec::new();
    };
    let image_sel = sel(&table.image_selector);
    let release_sel = sel(&table.release_selector);

    let mut results = Vec::new();
    for item in doc.select(&item_sel) {
        let Some(href) = first_attr(&item, &link_sel, "href") else { continue };
        let id = href
            .trim_start_matches(&table.link_strip_prefix)
            .trim_start_matches('/')
            .to_string();
        if id.is_empty() {
            continue;
        }
        let title = first_text(&item, &title_sel)
            .or_else(|| first_attr(&item, &title_sel, "title"))
            .unwrap_or_else(|| id.clone());
        let image = image_sel
            .as_ref()
            .and_then(|s| first_attr(&item, s, "src"))
            .map(|src| ensure_absolute(&src, base));
        let release = release_sel.as_ref().and_then(|s| first_text(&item, s));
        results.push(SearchResult { id, title, image, release, guessed: false });
    }
    results
}

/// Pull the anchor fields out of a series page. `None` when the internal id
/// is missing; without it the episode list cannot be addressed, so the
/// page is useless no matter what else parsed.
pub fn parse_series_page(html: &str, table: &InfoTable, base: &str) -> Option<SeriesAnchors> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let internal_id = sel(&table.internal_id_selector)
        .and_then(|s| first_attr(&root, &s, "value"))?;

    let alias = sel(&table.alias_selector)
        .and_then(|s| first_attr(&root, &s, "value"))
        .unwrap_or_default();

    let ep_end = sel(&table.ep_end_selector)
        .and_then(|s| {
            root.select(&s)
                .last()
                .and_then(|el| el.value().attr(&table.ep_end_attr))
                .map(|v| v.to_string())
        })
        .unwrap_or_else(|| table.ep_end_default.clone());

    let title = sel(&table.title_selector).and_then(|s| first_text(&root, &s));
    let image = sel(&table.image_selector)
        .and_then(|s| first_attr(&root, &s, "src"))
        .map(|src| ensure_absolute(&src, base));
    let description = sel(&table.description_selector).and_then(|s| first_text(&root, &s));

    Some(SeriesAnchors { title, image, description, internal_id, alias, ep_end })
}

/// Parse an episode-list fragment.
///
/// Upstream serves episodes newest-first; the returned list is explicitly
/// reversed into ascending order, and callers depend on that. Malformed
/// relative ids are repaired by re-prefixing the series id, and a missing
/// numeric label is reconstructed from the episode's position.
pub fn parse_episode_list(html: &str, table: &InfoTable, series_id: &str) -> Vec<Episode> {
    let doc = Html::parse_document(html);
    let (Some(item_sel), Some(link_sel)) = (
        sel(&table.episode_item_selector),
        sel(&table.episode_link_selector),
    ) else {
        return Vec::new();
    };
    let name_sel = sel(&table.episode_name_selector);

    let mut raw: Vec<(String, Option<f64>)> = Vec::new();
    for item in doc.select(&item_sel) {
        let Some(href) = first_attr(&item, &link_sel, "href") else { continue };
        let mut ep_id = href.trim().trim_start_matches('/').to_string();
        if ep_id.is_empty() {
            continue;
        }
        // Some mirrors emit bare "-episode-7" fragments; stitch the series
        // id back on so the id can stand alone in a later watch request.
        if ep_id.starts_with('-') || !ep_id.contains(series_id) {
            let suffix = ep_id.trim_start_matches('-');
            ep_id = format!("{}-{}", series_id, suffix);
        }

        let number = name_sel.as_ref().and_then(|s| {
            first_text(&item, s).and_then(|label| {
                label
                    .trim_start_matches(&table.episode_name_prefix)
                    .trim()
                    .parse::<f64>()
                    .ok()
            })
        });
        raw.push((ep_id, number));
    }

    // Upstream order is newest-first. Reverse before returning: this is
    // part of the contract, callers get ascending episode numbers.
    raw.reverse();

    raw.into_iter()
        .enumerate()
        .map(|(i, (id, number))| Episode {
            id,
            number: number.unwrap_or((i + 1) as f64),
        })
        .collect()
}
