//! Error types for fanout-deliver.

use std::time::Duration;

use thiserror::Error;

use crate::data::DeliveryReference;

/// Failure reported by a [`Channel`](crate::Channel) for one send.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The receiver is rate-limiting this sender.
    ///
    /// `retry_after` is the receiver's suggested wait, when it gave one.
    /// `reference` is set when the upload was stored before the send was
    /// refused, so the next attempt can reuse it.
    #[error("throttled (retry after {retry_after:?})")]
    Throttled {
        retry_after: Option<Duration>,
        reference: Option<DeliveryReference>,
    },

    /// Any other failure. Retried within the attempt budget.
    #[error("{0}")]
    Transient(String),
}

impl ChannelError {
    pub fn throttled(retry_after: Option<Duration>) -> Self {
        Self::Throttled {
            retry_after,
            reference: None,
        }
    }

    pub fn is_throttle(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

/// An item that could not be delivered to its recipient.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("failed to send image after {attempts} retries")]
    Exhausted { attempts: u32 },
}
