use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::{accept_body, is_success, retry_delay};
use crate::data::FetchOptions;
use crate::effects::http::HttpClient;
use crate::error::FetchError;

/// Downloads one resource into memory with bounded retries.
pub struct Fetcher<C: HttpClient> {
    client: C,
    options: FetchOptions,
}

impl<C: HttpClient> Fetcher<C> {
    /// Create a new fetcher with the provided HTTP client and default options.
    pub fn new(client: C) -> Self {
        Self {
            client,
            options: FetchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetch `url`, retrying failed attempts with linear backoff.
    ///
    /// Returns an empty payload when every attempt failed or `cancel` fired.
    /// Callers treat that as "skip this resource", never as a batch failure.
    pub async fn fetch(&self, cancel: &CancellationToken, url: &str) -> Bytes {
        let max_attempts = self.options.max_attempts.max(1);

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = retry_delay(attempt, self.options.retry_backoff);
                debug!(url, attempt, ?delay, "retrying download");

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(url, attempt, "download cancelled during backoff");
                        return Bytes::new();
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            match self.attempt(cancel, url).await {
                Ok(body) => {
                    debug!(url, size = body.len(), attempt = attempt + 1, "download successful");
                    return body;
                }
                Err(FetchError::Cancelled) => {
                    debug!(url, attempt = attempt + 1, "download cancelled");
                    return Bytes::new();
                }
                Err(err) => {
                    debug!(url, %err, attempt = attempt + 1, "download failed");
                }
            }
        }

        warn!(url, max_attempts, "failed to download after all retries");
        Bytes::new()
    }

    /// Make exactly one attempt, bounded by the per-fetch timeout.
    pub async fn attempt(&self, cancel: &CancellationToken, url: &str) -> Result<Bytes, FetchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            read = tokio::time::timeout(self.options.timeout, self.read_body(url)) => {
                read.map_err(|_| FetchError::Timeout)?
            }
        }
    }

    fn map_error<E: std::error::Error>(e: E) -> FetchError {
        FetchError::Network(e.to_string())
    }

    async fn read_body(&self, url: &str) -> Result<Bytes, FetchError> {
        let limit = self.options.max_body_bytes;
        let response = self
            .client
            .get(url, &self.options.headers)
            .await
            .map_err(Self::map_error)?;

        if !is_success(response.status) {
            return Err(FetchError::Status(response.status));
        }

        let mut body = BytesMut::new();
        let mut stream = response.body;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Self::map_error)?;
            if body.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        accept_body(response.status, body.len(), limit)?;
        Ok(body.freeze())
    }
}
