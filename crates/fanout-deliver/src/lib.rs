//! Rate-limited delivery across several output channels.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Options, identifiers and delivery items
//! - [`core`] - Pure policy: throttle waits, agent health, captions
//! - [`effects`] - Channels, agent pool and the dispatcher
//!
//! A [`Dispatcher`] owns one primary [`Channel`] and an [`AgentPool`] of
//! secondary ones. Each channel is paced independently, so adding agents
//! raises total throughput.

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use core::{HealthState, caption_for, classify, parse_retry_after, throttle_wait};
pub use data::{ChatId, Delivery, DeliveryOptions, DeliveryReference, Media, MessageId};
pub use effects::{Agent, AgentPool, Channel, Dispatcher, Pacer};

#[cfg(feature = "telegram")]
pub use effects::TelegramChannel;

pub use error::{ChannelError, DeliveryError};
