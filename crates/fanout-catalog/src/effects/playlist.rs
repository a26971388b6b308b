//! Appends resolved tracks to a user playlist, skipping tracks already there.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::data::model::{Page, PlaylistItem};
use crate::effects::auth::{Grant, TokenCache};
use crate::effects::spotify::{DEFAULT_API_URL, DEFAULT_AUTH_URL};
use crate::error::{CatalogError, Result};

/// Most tracks the API accepts per add or list request.
const BATCH: usize = 100;
const BATCH_PAUSE: Duration = Duration::from_millis(500);

/// Writes to one playlist on behalf of the user behind a refresh token.
pub struct PlaylistWriter {
    client: reqwest::Client,
    api_url: String,
    playlist_id: String,
    tokens: TokenCache,
}

impl std::fmt::Debug for PlaylistWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistWriter")
            .field("playlist_id", &self.playlist_id)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl PlaylistWriter {
    pub fn new(
        client: reqwest::Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
        playlist_id: impl Into<String>,
    ) -> Self {
        let tokens = TokenCache::new(
            client.clone(),
            DEFAULT_AUTH_URL,
            client_id,
            client_secret,
            Grant::RefreshToken(refresh_token.into()),
        );
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            playlist_id: playlist_id.into(),
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

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    /// Ids of every track currently in the playlist.
    pub async fn existing_track_ids(&self) -> Result<HashSet<String>> {
        let token = self.tokens.get().await?;
        let mut ids = HashSet::new();
        let mut offset = 0;

        loop {
            let url = format!("{}/playlists/{}/tracks", self.api_url, self.playlist_id);
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("offset", offset.to_string()),
                    ("limit", BATCH.to_string()),
                    ("fields", "items(track(id))".to_string()),
                ])
                .bearer_auth(&token)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(CatalogError::Http {
                    status: status.as_u16(),
                    body,
                });
            }

            let page: Page<PlaylistItem> = serde_json::from_str(&body)?;
            let count = page.items.len();
            ids.extend(page.items.into_iter().filter_map(|item| item.track?.id));

            if count < BATCH {
                break;
            }
            offset += BATCH;
        }

        debug!(playlist = %self.playlist_id, tracks = ids.len(), "playlist contents loaded");
        Ok(ids)
    }

    /// Insert `uris` at the top of the playlist, in batches.
    pub async fn add_tracks(&self, uris: &[String]) -> Result<()> {
        if uris.is_empty() {
            return Ok(());
        }
        let token = self.tokens.get().await?;
        let url = format!("{}/playlists/{}/tracks", self.api_url, self.playlist_id);

        let batches = uris.chunks(BATCH).count();
        for (n, batch) in uris.chunks(BATCH).enumerate() {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&token)
                .json(&json!({ "uris": batch, "position": 0 }))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(CatalogError::Http {
                    status: status.as_u16(),
                    body: response.text().await?,
                });
            }
            info!(
                playlist = %self.playlist_id,
                batch_start = n * BATCH,
                batch_len = batch.len(),
                total = uris.len(),
                "added tracks to playlist"
            );

            if n + 1 < batches {
                tokio::time::sleep(BATCH_PAUSE).await;
            }
        }
        Ok(())
    }

    /// Add the tracks from `track_ids` that the playlist does not hold yet.
    /// Returns how many were added.
    ///
    /// When the current contents cannot be listed every track is added.
    pub async fn add_new(&self, track_ids: impl IntoIterator<Item = String>) -> Result<usize> {
        let existing = match self.existing_track_ids().await {
            Ok(existing) => existing,
            Err(err) => {
                warn!(playlist = %self.playlist_id, %err, "failed to check existing tracks, adding all");
                HashSet::new()
            }
        };

        let mut seen = HashSet::new();
        let uris: Vec<String> = track_ids
            .into_iter()
            .filter(|id| !id.is_empty() && !existing.contains(id) && seen.insert(id.clone()))
            .map(|id| format!("spotify:track:{id}"))
            .collect();

        if uris.is_empty() {
            info!(playlist = %self.playlist_id, "all tracks already in playlist");
            return Ok(0);
        }

        info!(playlist = %self.playlist_id, new_tracks = uris.len(), "adding new tracks to playlist");
        self.add_tracks(&uris).await?;
        Ok(uris.len())
    }
}
