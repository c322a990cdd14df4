//! HTML parsing for catalog listing and detail pages
//!
//! Listing pages nest variant sets inside `<details>` blocks whose `<summary>`
//! carries the game title; detail pages carry the title, genre, parent set and
//! download links. Parsing never touches the network.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::app::models::{FilePart, PartRole};
use crate::constants::{mdk, selectors};
use crate::errors::{PageParseError, ParseResult};

/// One game link found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub identifier: String,
    pub title: String,
}

/// Parsed listing page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub rows: Vec<ListingRow>,
    pub next: Option<Url>,
}

/// Parsed game detail page
#[derive(Debug, Clone)]
pub struct DetailPage {
    pub title: String,
    pub category: Option<String>,
    pub parent: Option<String>,
    pub parts: Vec<FilePart>,
}

fn selector(css: &str) -> ParseResult<Selector> {
    Selector::parse(css).map_err(|_| PageParseError::InvalidSelector {
        selector: css.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identifier from a `/game/<id>` href
fn game_identifier(href: &str) -> Option<String> {
    let prefix = format!("/{}/", mdk::GAME_PATH);
    let rest = href.strip_prefix(&prefix)?;
    let id = rest.trim_end_matches('/');
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return None;
    }
    Some(id.to_lowercase())
}

/// Parse a manufacturer listing page
pub fn parse_listing(html: &str, page_url: &Url) -> ParseResult<ListingPage> {
    let document = Html::parse_document(html);
    let link_selector = selector(selectors::GAME_LINK)?;
    let summary_selector = selector("summary")?;
    let next_selector = selector(selectors::NEXT_PAGE)?;

    let mut page = ListingPage::default();

    for link in document.select(&link_selector) {
        let Some(identifier) = link.value().attr("href").and_then(game_identifier) else {
            continue;
        };
        if page.rows.iter().any(|row| row.identifier == identifier) {
            continue;
        }

        // Variants nest under the parent's <details>; its <summary> names the game
        let summary_title = link
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "details")
            .and_then(|details| details.select(&summary_selector).next())
            .map(element_text)
            .filter(|t| !t.is_empty());

        let title = summary_title
            .or_else(|| Some(element_text(link)).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| identifier.clone());

        page.rows.push(ListingRow { identifier, title });
    }

    page.next = document
        .select(&next_selector)
        .filter_map(|el| el.value().attr("href"))
        .find_map(|href| page_url.join(href).ok());

    Ok(page)
}

/// Parse a game detail page into metadata and parts
///
/// # Errors
///
/// A page without a title or without download links is malformed, as is any
/// download link with an unreadable size or role attribute.
pub fn parse_detail(html: &str, identifier: &str, page_url: &Url) -> ParseResult<DetailPage> {
    let document = Html::parse_document(html);
    let title_selector = selector(selectors::DETAIL_TITLE)?;
    let genre_selector = selector(selectors::DETAIL_GENRE)?;
    let parent_selector = selector(selectors::DETAIL_PARENT)?;
    let download_selector = selector(selectors::DOWNLOAD_LINK)?;

    let title = document
        .select(&title_selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PageParseError::ElementNotFound {
            selector: selectors::DETAIL_TITLE.to_string(),
        })?;

    let category = document
        .select(&genre_selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());

    let parent = document
        .select(&parent_selector)
        .filter_map(|el| el.value().attr("href"))
        .find_map(game_identifier)
        .filter(|p| p != identifier);

    let mut parts: Vec<FilePart> = Vec::new();
    for link in document.select(&download_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = page_url
            .join(href)
            .map_err(|_| PageParseError::InvalidUrl {
                url: href.to_string(),
            })?;
        let name = part_name(&url).ok_or_else(|| PageParseError::InvalidUrl {
            url: url.to_string(),
        })?;
        if parts.iter().any(|p| p.name == name) {
            continue;
        }

        let size = match link.value().attr(selectors::SIZE_ATTR) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                PageParseError::InvalidSize {
                    part: name.clone(),
                    value: raw.to_string(),
                }
            })?),
            None => None,
        };

        let role = match link.value().attr(selectors::ROLE_ATTR) {
            Some(raw) => PartRole::from_token(raw).ok_or_else(|| PageParseError::InvalidRole {
                part: name.clone(),
                value: raw.to_string(),
            })?,
            None => infer_role(&url, &name, identifier, parent.as_deref()),
        };

        parts.push(FilePart::new(name, url, role, size));
    }

    if parts.is_empty() {
        return Err(PageParseError::NoDownloads);
    }

    Ok(DetailPage {
        title,
        category,
        parent,
        parts,
    })
}

/// Destination-relative name for a download URL
///
/// Archives land directly in the destination; CHDs go into a folder named
/// after their set, matching the emulator's rompath layout.
fn part_name(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let file = *segments.last()?;
    if file == "." || file == ".." {
        return None;
    }

    if url.path().contains(mdk::CHD_SEGMENT) && segments.len() >= 2 {
        let folder = segments[segments.len() - 2];
        return Some(format!("{}/{}", folder, file));
    }
    Some(file.to_string())
}

fn infer_role(url: &Url, name: &str, identifier: &str, parent: Option<&str>) -> PartRole {
    if url.path().contains(mdk::CHD_SEGMENT) {
        return PartRole::Delta;
    }

    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    match parent {
        Some(parent) if stem.eq_ignore_ascii_case(parent) => PartRole::Base,
        Some(_) if stem.eq_ignore_ascii_case(identifier) => PartRole::Delta,
        _ => PartRole::Base,
    }
}
