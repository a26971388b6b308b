use std::fmt;

use bytes::Bytes;

/// A recipient or sink on a delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message previously sent to a chat, for later edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to media already stored by the remote side.
///
/// Re-sending by reference skips the upload. Only valid for the current
/// operation; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryReference(String);

impl DeliveryReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a channel is asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    Upload(Bytes),
    Reference(DeliveryReference),
}

impl Media {
    pub fn is_upload(&self) -> bool {
        matches!(self, Self::Upload(_))
    }
}

/// One streamed item handed to the dispatcher.
///
/// `index` is the 1-based position among successful downloads, `total` the
/// number of items the operation expects.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub source_id: String,
    pub payload: Bytes,
    pub index: usize,
    pub total: usize,
}
