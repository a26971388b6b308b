//! Catalog lookup: find a catalog link in text, classify it, and resolve it
//! into `(cover URL, track id)` entries.
//!
//! - [`data`] - Locators and entries
//! - [`core`] - Link detection and track flattening
//! - [`effects`] - The [`Catalog`] trait, the HTTP implementation and the playlist writer

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use core::{clean_url, detect_kind, find_locator, parse_locator};
pub use data::{CatalogEntry, Locator, LocatorKind};
pub use effects::{Catalog, PlaylistWriter, SpotifyCatalog};
pub use error::{CatalogError, Result};
