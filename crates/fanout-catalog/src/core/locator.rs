use once_cell::sync::Lazy;
use regex::Regex;

use crate::data::{Locator, LocatorKind};
use crate::error::{CatalogError, Result};

static LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://open\.spotify\.com/[^\s<>]+").expect("valid link regex"));

static ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(track|album|playlist)/([a-zA-Z0-9]+)").expect("valid id regex")
});

/// Drop the query string.
pub fn clean_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

pub fn detect_kind(url: &str) -> LocatorKind {
    let url = clean_url(url);
    if url.contains("/track/") {
        LocatorKind::Track
    } else if url.contains("/album/") {
        LocatorKind::Album
    } else if url.contains("/playlist/") {
        LocatorKind::Playlist
    } else {
        LocatorKind::Unknown
    }
}

/// Classify a single catalog link.
///
/// # Examples
///
/// ```
/// use fanout_catalog::{LocatorKind, parse_locator};
///
/// let locator = parse_locator("https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy?si=x").unwrap();
/// assert_eq!(locator.kind, LocatorKind::Album);
/// assert_eq!(locator.id, "4aawyAB9vmqN3uQ7FjRGTy");
/// assert_eq!(locator.url, "https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy");
/// ```
pub fn parse_locator(url: &str) -> Result<Locator> {
    let url = clean_url(url);
    let kind = detect_kind(url);
    if kind == LocatorKind::Unknown {
        return Err(CatalogError::Unsupported(url.to_string()));
    }

    let id = ID_REGEX
        .captures_iter(url)
        .find(|caps| &caps[1] == kind.as_str())
        .map(|caps| caps[2].to_string())
        .ok_or_else(|| CatalogError::Unsupported(format!("cannot extract {kind} id from {url}")))?;

    Ok(Locator {
        kind,
        id,
        url: url.to_string(),
    })
}

/// Find and classify the first catalog link in free text.
pub fn find_locator(text: &str) -> Result<Locator> {
    let link = LINK_REGEX
        .find(text)
        .ok_or_else(|| CatalogError::NotFound("no catalog link in message".to_string()))?;
    parse_locator(link.as_str())
}
