//! Wire shapes of the catalog API, reduced to the fields used here.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub album: AlbumRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: usize,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tracks: Page<Track>,
}

/// Playlist entries can be null (removed or local tracks).
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Playlist {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tracks: Page<PlaylistItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}
