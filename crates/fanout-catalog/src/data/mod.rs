mod locator;
pub(crate) mod model;

pub use locator::{Locator, LocatorKind};

/// One downloadable cover: its URL and the track it came from.
///
/// `source_id` always names the item; `track_id` is set only when the
/// catalog gave the track a real id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub resource_key: String,
    pub source_id: String,
    pub track_id: Option<String>,
}

impl CatalogEntry {
    pub fn new(resource_key: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            resource_key: resource_key.into(),
            source_id: source_id.into(),
            track_id: None,
        }
    }

    /// An entry named after a catalog track id.
    pub fn track(resource_key: impl Into<String>, track_id: impl Into<String>) -> Self {
        let track_id = track_id.into();
        Self {
            resource_key: resource_key.into(),
            source_id: track_id.clone(),
            track_id: Some(track_id),
        }
    }
}
