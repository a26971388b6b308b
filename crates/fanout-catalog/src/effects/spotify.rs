//! Spotify Web API catalog using the client-credentials flow.

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::core::entries_from_tracks;
use crate::data::model::{Album, Page, Playlist, PlaylistItem, Track};
use crate::data::{CatalogEntry, Locator, LocatorKind};
use crate::effects::auth::{Grant, TokenCache};
use crate::effects::catalog::Catalog;
use crate::error::{CatalogError, Result};

pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/api/token";

const ALBUM_PAGE: usize = 50;
const PLAYLIST_PAGE: usize = 100;
/// Editorial playlists are not served to client-credentials apps.
const EDITORIAL_PREFIX: &str = "37i9dQZF";

pub struct SpotifyCatalog {
    client: reqwest::Client,
    api_url: String,
    tokens: TokenCache,
}

impl std::fmt::Debug for SpotifyCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyCatalog")
            .field("client_id", &self.tokens.client_id())
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl SpotifyCatalog {
    pub fn new(client: reqwest::Client, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        let tokens = TokenCache::new(
            client.clone(),
            DEFAULT_AUTH_URL,
            client_id,
            client_secret,
            Grant::ClientCredentials,
        );
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            tokens,
        }
    }

    /// Override the API and token endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, api_url: impl Into<String>, auth_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self.tokens.set_auth_url(auth_url);
        self
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.tokens.get().await?;
        let url = format!("{}{}", self.api_url, path);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CatalogError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn track(&self, id: &str) -> Result<Vec<Track>> {
        let track: Track = self.get(&format!("/tracks/{id}")).await?;
        Ok(vec![track])
    }

    async fn album_tracks(&self, id: &str) -> Result<Vec<Track>> {
        let album: Album = self.get(&format!("/albums/{id}")).await?;
        let total = album.tracks.total;
        let mut tracks = album.tracks.items;

        let mut offset = ALBUM_PAGE;
        while offset < total {
            let path = format!("/albums/{id}/tracks?offset={offset}&limit={ALBUM_PAGE}");
            match self.get::<Page<Track>>(&path).await {
                Ok(page) => tracks.extend(page.items),
                Err(err) => {
                    warn!(album = id, offset, %err, "stopping album pagination");
                    break;
                }
            }
            offset += ALBUM_PAGE;
        }

        // Album track listings carry no album object; every track shares the album cover.
        for track in &mut tracks {
            track.album.images.clone_from(&album.images);
        }

        debug!(album = %album.name, tracks = tracks.len(), "album resolved");
        Ok(tracks)
    }

    async fn playlist_tracks(&self, id: &str) -> Result<Vec<Track>> {
        let playlist: Playlist = match self.get(&format!("/playlists/{id}")).await {
            Ok(playlist) => playlist,
            Err(CatalogError::Http { status: 404, .. }) if id.starts_with(EDITORIAL_PREFIX) => {
                return Err(CatalogError::NotFound(
                    "editorial playlists are not accessible via API".to_string(),
                ));
            }
            Err(err) => return Err(err),
        };

        let total = playlist.tracks.total;
        let mut tracks: Vec<Track> = playable(playlist.tracks.items).collect();

        let mut offset = PLAYLIST_PAGE;
        while offset < total {
            let path = format!("/playlists/{id}/tracks?offset={offset}&limit={PLAYLIST_PAGE}");
            match self.get::<Page<PlaylistItem>>(&path).await {
                Ok(page) => tracks.extend(playable(page.items)),
                Err(err) => {
                    warn!(playlist = id, offset, %err, "stopping playlist pagination");
                    break;
                }
            }
            offset += PLAYLIST_PAGE;
        }

        debug!(playlist = %playlist.name, tracks = tracks.len(), "playlist resolved");
        Ok(tracks)
    }
}

/// Playlist entries with a track id and at least one cover.
fn playable(items: Vec<PlaylistItem>) -> impl Iterator<Item = Track> {
    items.into_iter().filter_map(|item| item.track).filter(|track| {
        track.id.as_deref().is_some_and(|id| !id.is_empty()) && !track.album.images.is_empty()
    })
}

impl Catalog for SpotifyCatalog {
    async fn resolve(&self, locator: &Locator) -> Result<Vec<CatalogEntry>> {
        let tracks = match locator.kind {
            LocatorKind::Track => self.track(&locator.id).await?,
            LocatorKind::Album => self.album_tracks(&locator.id).await?,
            LocatorKind::Playlist => self.playlist_tracks(&locator.id).await?,
            LocatorKind::Unknown => return Err(CatalogError::Unsupported(locator.url.clone())),
        };

        let entries = entries_from_tracks(&tracks);
        info!(
            url = %locator.url,
            kind = %locator.kind,
            source_id = %locator.id,
            track_count = tracks.len(),
            cover_count = entries.len(),
            "catalog link resolved"
        );
        Ok(entries)
    }
}
