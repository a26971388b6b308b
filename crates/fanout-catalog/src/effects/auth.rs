//! Access tokens for the catalog API, cached until shortly before expiry.

use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::data::model::TokenResponse;
use crate::error::{CatalogError, Result};

/// Tokens are refreshed this long before they actually expire.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

/// How a token is obtained from the accounts service.
#[derive(Clone)]
pub(crate) enum Grant {
    /// App-only access; enough for reading public data.
    ClientCredentials,
    /// User access through a long-lived refresh token; needed to modify playlists.
    RefreshToken(String),
}

impl Grant {
    fn form(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::ClientCredentials => vec![("grant_type", "client_credentials")],
            Self::RefreshToken(token) => vec![("grant_type", "refresh_token"), ("refresh_token", token.as_str())],
        }
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub(crate) struct TokenCache {
    client: reqwest::Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
    grant: Grant,
    token: RwLock<Option<AccessToken>>,
}

impl TokenCache {
    pub(crate) fn new(
        client: reqwest::Client,
        auth_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        grant: Grant,
    ) -> Self {
        Self {
            client,
            auth_url: auth_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            grant,
            token: RwLock::new(None),
        }
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn set_auth_url(&mut self, auth_url: impl Into<String>) {
        self.auth_url = auth_url.into();
        *self.token.get_mut() = None;
    }

    /// A valid bearer token, fetching a new one when the cached one expired.
    pub(crate) async fn get(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref()
            && Instant::now() < token.expires_at
        {
            return Ok(token.value.clone());
        }

        let mut slot = self.token.write().await;
        if let Some(token) = slot.as_ref()
            && Instant::now() < token.expires_at
        {
            return Ok(token.value.clone());
        }

        debug!(refresh = matches!(self.grant, Grant::RefreshToken(_)), "requesting catalog access token");
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&self.grant.form())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CatalogError::Auth(format!("status {}: {}", status.as_u16(), body)));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(TOKEN_MARGIN);
        *slot = Some(AccessToken {
            value: parsed.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(parsed.access_token)
    }
}
