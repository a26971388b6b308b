mod entries;
mod locator;

pub(crate) use entries::entries_from_tracks;
pub use locator::{clean_url, detect_kind, find_locator, parse_locator};
