//! Error types for fanout-fetch.

use thiserror::Error;

/// Why a single fetch attempt produced no usable body.
///
/// These never escape the [`Fetcher`](crate::Fetcher) retry loop; an exhausted
/// fetch is reported as an empty payload instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("empty response body")]
    EmptyBody,

    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("request timeout")]
    Timeout,

    #[error("fetch cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Network(String),
}

/// Batch-level failures that end a streaming operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no images found")]
    EmptyBatch,

    #[error("processing timeout ({downloaded}/{total} downloaded)")]
    ProcessingTimeout { downloaded: usize, total: usize },

    #[error("no images were downloaded successfully ({total} attempted)")]
    NoSuccessfulDownloads { total: usize },
}

/// A task the worker pool refused to enqueue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("task rejected: worker pool is shutting down")]
    Rejected,
}
