use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fanout_catalog::{Catalog, CatalogEntry, Locator, PlaylistWriter, SpotifyCatalog, find_locator};
use fanout_deliver::{
    AgentPool, Channel, ChatId, Delivery, DeliveryError, Dispatcher, MessageId, TelegramChannel,
};
use fanout_fetch::{
    FetchResult, Fetcher, OperationStats, ReqwestClient, RequestBatch, StreamObserver, StreamSummary,
    StreamingCoordinator, TtlCache, WorkerPool,
};

use crate::config::Config;

const API_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
/// Least time between two edits of the status message.
const STATUS_INTERVAL: Duration = Duration::from_secs(3);

/// Streams each downloaded cover to one chat as soon as it arrives.
struct ChatDelivery<'a, C: Channel> {
    dispatcher: &'a Dispatcher<C>,
    chat: ChatId,
    stats: Arc<OperationStats>,
    /// Message rewritten with live progress, if the chat returned its id.
    status: Option<MessageId>,
    last_status: Instant,
}

impl<C: Channel> StreamObserver for ChatDelivery<'_, C> {
    type Error = DeliveryError;

    async fn on_item(&mut self, item: FetchResult, index: usize, total: usize) -> Result<(), DeliveryError> {
        let delivery = Delivery {
            source_id: item.source_id,
            payload: item.payload,
            index,
            total,
        };
        self.dispatcher.deliver(self.chat, &delivery).await?;
        self.stats.record_sent();
        Ok(())
    }

    async fn on_progress(&mut self, downloaded: usize, total: usize) {
        let sent = self.stats.sent();
        info!(chat_id = %self.chat, downloaded, total, sent, "processing");

        let Some(status) = self.status else {
            return;
        };
        if self.last_status.elapsed() < STATUS_INTERVAL {
            return;
        }
        self.last_status = Instant::now();
        let text = format!("⏳ Processing: {downloaded}/{total} downloaded, {sent} sent");
        self.dispatcher.edit_notice(self.chat, status, &text).await.ok();
    }
}

/// Writes each downloaded cover to `<dir>/<source_id>.jpg`.
struct DirectoryWriter {
    dir: PathBuf,
    written: usize,
}

impl StreamObserver for DirectoryWriter {
    type Error = std::io::Error;

    async fn on_item(&mut self, item: FetchResult, index: usize, total: usize) -> Result<(), std::io::Error> {
        let path = self.dir.join(format!("{}.jpg", item.source_id));
        tokio::fs::write(&path, &item.payload).await?;
        self.written += 1;
        debug!(path = %path.display(), index, total, "cover saved");
        Ok(())
    }

    async fn on_progress(&mut self, downloaded: usize, total: usize) {
        info!(downloaded, total, written = self.written, "processing");
    }
}

/// A link resolved into the covers to fetch.
struct Resolved {
    locator: Locator,
    batch: RequestBatch,
    /// Catalog ids of every track behind the link, covers shared or not.
    track_ids: Vec<String>,
}

pub struct App {
    catalog: SpotifyCatalog,
    cache: TtlCache<String, Vec<CatalogEntry>>,
    coordinator: StreamingCoordinator,
    dispatcher: Option<Dispatcher<TelegramChannel>>,
    playlist: Option<PlaylistWriter>,
}

impl App {
    /// Build every component. Delivery channels are only set up when
    /// `deliver` is true.
    pub fn new(config: &Config, deliver: bool) -> anyhow::Result<Self> {
        let api_client = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .context("failed to build catalog HTTP client")?;
        let catalog = SpotifyCatalog::new(
            api_client.clone(),
            &config.catalog_client_id,
            &config.catalog_client_secret,
        )
        .with_endpoints(&config.catalog_api_url, &config.catalog_auth_url);

        let playlist = match config.auto_playlist() {
            Some((playlist_id, refresh_token)) if deliver => {
                info!(playlist = playlist_id, "sent tracks will be added to playlist");
                Some(
                    PlaylistWriter::new(
                        api_client,
                        &config.catalog_client_id,
                        &config.catalog_client_secret,
                        refresh_token,
                        playlist_id,
                    )
                    .with_endpoints(&config.catalog_api_url, &config.catalog_auth_url),
                )
            }
            _ => None,
        };

        let transport = ReqwestClient::new().context("failed to build download HTTP client")?;
        let fetcher = Fetcher::new(transport).with_options(config.fetch_options());
        let pool = Arc::new(WorkerPool::new(fetcher, config.pool_options()));
        let coordinator = StreamingCoordinator::new(pool, config.stream_options());

        let dispatcher = if deliver {
            Some(build_dispatcher(config)?)
        } else {
            None
        };

        Ok(Self {
            catalog,
            cache: TtlCache::new(config.cache_ttl()),
            coordinator,
            dispatcher,
            playlist,
        })
    }

    /// Find the catalog link in `text` and resolve it, reusing cached entries.
    async fn resolve(&self, text: &str) -> anyhow::Result<Resolved> {
        let locator = find_locator(text)?;

        let entries = match self.cache.get(&locator.url) {
            Some(entries) => {
                debug!(url = %locator.url, "resolve cache hit");
                entries
            }
            None => {
                let entries = self
                    .catalog
                    .resolve(&locator)
                    .await
                    .context("failed to get tracks")?;
                self.cache.put(locator.url.clone(), entries.clone());
                entries
            }
        };

        let track_ids = entries.iter().filter_map(|e| e.track_id.clone()).collect();
        let batch = RequestBatch::new(entries.into_iter().map(|e| (e.resource_key, e.source_id)));
        debug!(unique_images = batch.len(), "found unique images");
        Ok(Resolved {
            locator,
            batch,
            track_ids,
        })
    }

    /// Stream every cover behind the link in `text` to `chat`, then report
    /// the outcome to the chat. Returns the number of covers sent.
    ///
    /// A status message tracks progress while covers stream and is removed
    /// once they are all sent; on failure it is rewritten with the error.
    pub async fn send(&self, chat: ChatId, text: &str, cancel: &CancellationToken) -> anyhow::Result<usize> {
        let dispatcher = self
            .dispatcher
            .as_ref()
            .context("delivery channels are not configured")?;

        let mut status = None;
        match self.stream_to_chat(dispatcher, chat, text, &mut status, cancel).await {
            Ok((sent, track_ids)) => {
                if let Some(status) = status {
                    dispatcher.delete_notice(chat, status).await.ok();
                }
                dispatcher
                    .notify(chat, &format!("✅ Successfully sent {sent} covers!"))
                    .await
                    .ok();
                self.sync_playlist(track_ids).await;
                Ok(sent)
            }
            Err(err) => {
                error!(chat_id = %chat, error = %format!("{err:#}"), "failed to process link");
                let report = format!("❌ Error: {err:#}");
                let edited = match status {
                    Some(status) => dispatcher.edit_notice(chat, status, &report).await.is_ok(),
                    None => false,
                };
                if !edited {
                    dispatcher.notify(chat, &report).await.ok();
                }
                Err(err)
            }
        }
    }

    async fn stream_to_chat(
        &self,
        dispatcher: &Dispatcher<TelegramChannel>,
        chat: ChatId,
        text: &str,
        status: &mut Option<MessageId>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<(usize, Vec<String>)> {
        let Resolved {
            locator,
            batch,
            track_ids,
        } = self.resolve(text).await?;
        info!(chat_id = %chat, url = %locator.url, kind = %locator.kind, "processing request");
        *status = dispatcher
            .notify(chat, &format!("⏳ Processing {}...", locator.kind))
            .await
            .ok()
            .flatten();

        let op = self.coordinator.operation(cancel);
        let stats = op.stats();
        let mut observer = ChatDelivery {
            dispatcher,
            chat,
            stats: Arc::clone(&stats),
            status: *status,
            last_status: Instant::now(),
        };

        let summary = self.coordinator.run(op, batch, &mut observer).await?;
        let sent = stats.sent();
        info!(
            chat_id = %chat,
            image_count = sent,
            downloaded = summary.downloaded,
            total = summary.total,
            "successfully processed request"
        );
        Ok((sent, track_ids))
    }

    /// Add the sent tracks to the configured playlist. Failures are logged
    /// and never fail the request.
    async fn sync_playlist(&self, track_ids: Vec<String>) {
        let Some(playlist) = &self.playlist else {
            return;
        };
        match playlist.add_new(track_ids).await {
            Ok(added) => info!(playlist = playlist.playlist_id(), added, "playlist updated"),
            Err(err) => warn!(playlist = playlist.playlist_id(), %err, "failed to update playlist"),
        }
    }

    /// Download every cover behind the link in `text` into `out`.
    pub async fn fetch_to_dir(&self, text: &str, out: &Path, cancel: &CancellationToken) -> anyhow::Result<StreamSummary> {
        tokio::fs::create_dir_all(out)
            .await
            .with_context(|| format!("failed to create {}", out.display()))?;

        let Resolved { locator, batch, .. } = self.resolve(text).await?;
        info!(url = %locator.url, kind = %locator.kind, covers = batch.len(), "fetching covers");

        let mut writer = DirectoryWriter {
            dir: out.to_path_buf(),
            written: 0,
        };
        let op = self.coordinator.operation(cancel);
        let summary = self.coordinator.run(op, batch, &mut writer).await?;
        Ok(summary)
    }

    /// Handle links from stdin until EOF or cancellation. Failures on one
    /// line are reported and the loop moves on.
    pub async fn watch(&self, chat: ChatId, cancel: &CancellationToken) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line.context("failed to read stdin")?,
            };
            let Some(line) = line else {
                break;
            };
            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            if let Err(err) = self.send(chat, text, cancel).await {
                warn!(error = %format!("{err:#}"), "link skipped");
            }
            if cancel.is_cancelled() {
                break;
            }
        }

        Ok(())
    }

    /// Stop the worker pool, waiting for in-flight downloads.
    pub async fn shutdown(&self) {
        self.coordinator.pool().shutdown().await;
    }
}

fn build_dispatcher(config: &Config) -> anyhow::Result<Dispatcher<TelegramChannel>> {
    let client = reqwest::Client::builder()
        .timeout(UPLOAD_TIMEOUT)
        .build()
        .context("failed to build delivery HTTP client")?;
    let channel = |token: &str| TelegramChannel::new(client.clone(), token).with_api_url(&config.telegram_api_url);

    let options = config.delivery_options();
    let agents = AgentPool::new(
        config.worker_bot_tokens.iter().map(|token| channel(token)),
        options.send_interval,
        options.failure_threshold,
    );

    Ok(Dispatcher::new(
        channel(&config.bot_token),
        agents,
        config.log_channel_id.map(ChatId),
        options,
    ))
}
