//! Immutable data types for fetch operations.
//!
//! This module contains the configuration types and the records that move
//! between the coordinator and the worker pool.

pub mod options;
pub mod task;

pub use options::{DEFAULT_MAX_BODY_BYTES, FetchOptions, PoolOptions, StreamOptions};
pub use task::{
    FetchResult, FetchTask, OperationContext, OperationStats, RequestBatch, StreamSummary,
};
