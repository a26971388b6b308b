//! Concurrent resource downloading with streaming result delivery.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and records
//! - [`core`] - Pure transformations
//! - [`effects`] - I/O operations with trait abstraction
//!
//! # Key Features
//!
//! - **Bounded Retries**: every fetch makes at most a fixed number of attempts with linear backoff
//! - **Backpressure**: a bounded task queue blocks producers instead of growing without limit
//! - **Streaming**: results reach the caller in completion order, one at a time, as they finish
//! - **Failure Isolation**: a failed download is an empty result, never a batch abort

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use core::{accept_body, retry_delay};
pub use data::{
    FetchOptions, FetchResult, FetchTask, OperationContext, OperationStats, PoolOptions,
    RequestBatch, StreamOptions, StreamSummary,
};
pub use effects::{
    BoxStream, Fetcher, HttpClient, HttpResponse, StreamObserver, StreamingCoordinator, TtlCache,
    WorkerPool,
};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{FetchError, PipelineError, SubmitError};
