//! Layered configuration: defaults, TOML file, `FANOUT_*` environment, CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail, ensure};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Deserializer, Serialize};

use fanout_deliver::DeliveryOptions;
use fanout_fetch::{FetchOptions, PoolOptions, StreamOptions};

const ENV_PREFIX: &str = "FANOUT_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Primary bot credential.
    pub bot_token: String,
    /// Secondary bot credentials; a comma separated string is accepted.
    #[serde(deserialize_with = "token_list")]
    pub worker_bot_tokens: Vec<String>,
    /// Mirror channel; stage 1 is skipped when unset.
    pub log_channel_id: Option<i64>,
    pub catalog_client_id: String,
    pub catalog_client_secret: String,
    /// Playlist that receives every track sent; needs `catalog_refresh_token`.
    pub auto_playlist_id: Option<String>,
    pub catalog_refresh_token: Option<String>,

    pub workers: usize,
    pub fetch_timeout_secs: u64,
    pub process_timeout_secs: u64,
    pub max_file_size_mb: usize,
    pub messages_per_second: u32,
    pub cache_ttl_secs: u64,

    pub log_level: String,
    pub debug: bool,
    pub log_dir: PathBuf,

    pub telegram_api_url: String,
    pub catalog_api_url: String,
    pub catalog_auth_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            worker_bot_tokens: Vec::new(),
            log_channel_id: None,
            catalog_client_id: String::new(),
            catalog_client_secret: String::new(),
            auto_playlist_id: None,
            catalog_refresh_token: None,
            workers: 100,
            fetch_timeout_secs: 15,
            process_timeout_secs: 30 * 60,
            max_file_size_mb: 20,
            messages_per_second: 15,
            cache_ttl_secs: 300,
            log_level: "info".to_string(),
            debug: false,
            log_dir: PathBuf::from("."),
            telegram_api_url: fanout_deliver::effects::DEFAULT_API_URL.to_string(),
            catalog_api_url: fanout_catalog::effects::DEFAULT_API_URL.to_string(),
            catalog_auth_url: fanout_catalog::effects::DEFAULT_AUTH_URL.to_string(),
        }
    }
}

/// Command line values that take precedence over every other source.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

fn token_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tokens {
        List(Vec<String>),
        Joined(String),
    }

    let tokens = match Tokens::deserialize(deserializer)? {
        Tokens::List(list) => list,
        Tokens::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(tokens
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

impl Config {
    pub fn figment(path: &Path, overrides: &Overrides) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::globals(overrides))
    }

    pub fn load(path: &Path, overrides: &Overrides) -> anyhow::Result<Self> {
        Self::figment(path, overrides)
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))
    }

    /// Checks shared by every command.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            !self.catalog_client_id.is_empty() && !self.catalog_client_secret.is_empty(),
            "catalog_client_id and catalog_client_secret are required"
        );
        ensure!(self.workers > 0, "workers must be greater than zero");
        ensure!(self.messages_per_second > 0, "messages_per_second must be greater than zero");
        Ok(())
    }

    /// Checks for commands that deliver to chats.
    pub fn validate_delivery(&self) -> anyhow::Result<()> {
        if self.bot_token.is_empty() {
            bail!("bot_token is required");
        }
        Ok(())
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::default().timeout(Duration::from_secs(self.fetch_timeout_secs))
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions::default().workers(self.workers)
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions::default().deadline(Duration::from_secs(self.process_timeout_secs))
    }

    pub fn delivery_options(&self) -> DeliveryOptions {
        DeliveryOptions::default()
            .messages_per_second(self.messages_per_second)
            .max_item_bytes(self.max_file_size_mb.saturating_mul(1024 * 1024))
    }

    /// Playlist id and refresh token, when both are set.
    pub fn auto_playlist(&self) -> Option<(&str, &str)> {
        let playlist = self.auto_playlist_id.as_deref().filter(|id| !id.is_empty())?;
        let token = self.catalog_refresh_token.as_deref().filter(|t| !t.is_empty())?;
        Some((playlist, token))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn extract(path: &Path, overrides: &Overrides) -> Config {
        // Environment is left out so tests do not depend on the caller's shell.
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Serialized::globals(overrides))
            .extract()
            .unwrap()
    }

    #[test]
    fn test_defaults_without_file() {
        let config = extract(Path::new("does-not-exist.toml"), &Overrides::default());

        assert_eq!(config.workers, 100);
        assert_eq!(config.process_timeout_secs, 1800);
        assert_eq!(config.messages_per_second, 15);
        assert_eq!(config.log_channel_id, None);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_values_and_cli_precedence() {
        let file = write_toml(
            r#"
            bot_token = "primary"
            worker_bot_tokens = "a, b,,c"
            log_channel_id = -100123
            catalog_client_id = "id"
            catalog_client_secret = "secret"
            workers = 10
            "#,
        );
        let overrides = Overrides {
            workers: Some(4),
            debug: Some(true),
        };

        let config = extract(file.path(), &overrides);

        assert_eq!(config.worker_bot_tokens, vec!["a", "b", "c"]);
        assert_eq!(config.log_channel_id, Some(-100123));
        assert_eq!(config.workers, 4);
        assert!(config.debug);
        config.validate().unwrap();
        config.validate_delivery().unwrap();
    }

    #[test]
    fn test_token_list_accepts_array() {
        let file = write_toml(r#"worker_bot_tokens = ["x", " y "]"#);
        let config = extract(file.path(), &Overrides::default());
        assert_eq!(config.worker_bot_tokens, vec!["x", "y"]);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config {
            catalog_client_id: "id".into(),
            catalog_client_secret: "secret".into(),
            ..Config::default()
        };
        assert!(config.validate_delivery().is_err());

        config.messages_per_second = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_options() {
        let config = Config::default();
        assert_eq!(config.delivery_options().max_item_bytes, 20 * 1024 * 1024);
        assert_eq!(config.pool_options().queue_capacity(), 1000);
        assert_eq!(config.fetch_options().timeout, Duration::from_secs(15));
        assert_eq!(config.auto_playlist(), None);
    }

    #[test]
    fn test_auto_playlist_needs_both_keys() {
        let file = write_toml(r#"auto_playlist_id = "pl""#);
        let mut config = extract(file.path(), &Overrides::default());
        assert_eq!(config.auto_playlist_id.as_deref(), Some("pl"));
        assert_eq!(config.auto_playlist(), None);

        config.catalog_refresh_token = Some("refresh".into());
        assert_eq!(config.auto_playlist(), Some(("pl", "refresh")));

        config.catalog_refresh_token = Some(String::new());
        assert_eq!(config.auto_playlist(), None);
    }
}
