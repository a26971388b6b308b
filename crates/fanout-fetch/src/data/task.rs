use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::dedup_by_key;

/// One pending download, handed from a coordinator to the worker pool.
///
/// The worker that drains the task owns the write end of `result_sink` and
/// publishes exactly one [`FetchResult`] on it, unless the operation was
/// cancelled first.
#[derive(Debug)]
pub struct FetchTask {
    pub resource_key: String,
    pub source_id: String,
    pub result_sink: mpsc::Sender<FetchResult>,
    pub cancel: CancellationToken,
}

/// The outcome of one task.
///
/// An empty payload means every attempt failed. It is a normal value, not an
/// error, so one bad resource never blocks the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub resource_key: String,
    pub source_id: String,
    pub payload: Bytes,
    pub byte_size: usize,
}

impl FetchResult {
    pub fn new(resource_key: String, source_id: String, payload: Bytes) -> Self {
        let byte_size = payload.len();
        Self {
            resource_key,
            source_id,
            payload,
            byte_size,
        }
    }

    /// `true` when the download produced a usable body.
    pub fn is_success(&self) -> bool {
        !self.payload.is_empty()
    }
}

/// A deduplicated `resource key -> source id` mapping for one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestBatch {
    entries: Vec<(String, String)>,
}

impl RequestBatch {
    /// Build a batch, keeping the first source id seen for each key.
    pub fn new<I, K, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<String>,
    {
        Self {
            entries: dedup_by_key(entries.into_iter().map(|(k, s)| (k.into(), s.into()))),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), s.as_str()))
    }

    pub fn source_id(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, s)| s)
    }
}

impl IntoIterator for RequestBatch {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Progress counters for one operation.
///
/// `downloaded` and `succeeded` are advanced by the coordinator; `sent` is
/// left to the caller's item observer.
#[derive(Debug, Default)]
pub struct OperationStats {
    downloaded: AtomicUsize,
    succeeded: AtomicUsize,
    sent: AtomicUsize,
}

impl OperationStats {
    /// Record one finished download, returning the new count.
    pub fn record_download(&self) -> usize {
        self.downloaded.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Record one usable download, returning the new count.
    pub fn record_success(&self) -> usize {
        self.succeeded.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Record one delivered item, returning the new count.
    pub fn record_sent(&self) -> usize {
        self.sent.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::Acquire)
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Acquire)
    }

    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::Acquire)
    }
}

/// Deadline, cancellation and counters for exactly one streaming operation.
///
/// `cancel` is the caller's signal; `task_cancel` is handed to every task the
/// operation submits and is cancelled when the operation ends, so workers stop
/// retrying downloads nobody is waiting for.
#[derive(Debug)]
pub struct OperationContext {
    pub(crate) deadline: Instant,
    pub(crate) cancel: CancellationToken,
    pub(crate) task_cancel: CancellationToken,
    pub(crate) stats: Arc<OperationStats>,
}

impl OperationContext {
    pub(crate) fn new(
        deadline: Instant,
        cancel: CancellationToken,
        task_cancel: CancellationToken,
    ) -> Self {
        Self {
            deadline,
            cancel,
            task_cancel,
            stats: Arc::new(OperationStats::default()),
        }
    }

    /// Shared handle to this operation's counters.
    pub fn stats(&self) -> Arc<OperationStats> {
        Arc::clone(&self.stats)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Final counts of a completed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub total: usize,
    pub downloaded: usize,
    pub succeeded: usize,
    /// Unique keys the worker pool refused at submission time.
    pub rejected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_batch_dedups_by_key() {
        let batch = RequestBatch::new(vec![
            ("http://img/1", "a"),
            ("http://img/1", "b"),
            ("http://img/2", "a"),
        ]);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.source_id("http://img/1"), Some("a"));
        assert_eq!(batch.source_id("http://img/2"), Some("a"));
    }

    #[test]
    fn test_fetch_result_success_flag() {
        let ok = FetchResult::new("k".into(), "s".into(), Bytes::from_static(b"img"));
        assert!(ok.is_success());
        assert_eq!(ok.byte_size, 3);

        let failed = FetchResult::new("k".into(), "s".into(), Bytes::new());
        assert!(!failed.is_success());
        assert_eq!(failed.byte_size, 0);
    }

    #[test]
    fn test_operation_stats_counts() {
        let stats = OperationStats::default();
        assert_eq!(stats.record_download(), 1);
        assert_eq!(stats.record_download(), 2);
        assert_eq!(stats.record_success(), 1);
        assert_eq!(stats.record_sent(), 1);
        assert_eq!(stats.downloaded(), 2);
        assert_eq!(stats.succeeded(), 1);
        assert_eq!(stats.sent(), 1);
    }
}
