use std::future::Future;
use std::sync::Arc;

use crate::data::{ChatId, DeliveryReference, Media, MessageId};
use crate::error::ChannelError;

/// One credentialed output channel.
///
/// # Implementations
///
/// - [`TelegramChannel`](crate::TelegramChannel): Bot API over `reqwest`
/// - Mock implementations for testing
pub trait Channel: Send + Sync {
    /// Send media to `chat`, returning the stored object's reference when the
    /// remote side reports one.
    fn send_media(
        &self,
        chat: ChatId,
        media: Media,
        caption: Option<String>,
    ) -> impl Future<Output = Result<Option<DeliveryReference>, ChannelError>> + Send;

    /// Send plain text, returning the message id when the remote side reports one.
    fn send_text(&self, chat: ChatId, text: &str) -> impl Future<Output = Result<Option<MessageId>, ChannelError>> + Send;

    /// Replace the text of a message sent earlier.
    fn edit_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    fn delete_message(&self, chat: ChatId, message: MessageId) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

impl<T: Channel> Channel for Arc<T> {
    fn send_media(
        &self,
        chat: ChatId,
        media: Media,
        caption: Option<String>,
    ) -> impl Future<Output = Result<Option<DeliveryReference>, ChannelError>> + Send {
        (**self).send_media(chat, media, caption)
    }

    fn send_text(&self, chat: ChatId, text: &str) -> impl Future<Output = Result<Option<MessageId>, ChannelError>> + Send {
        (**self).send_text(chat, text)
    }

    fn edit_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send {
        (**self).edit_text(chat, message, text)
    }

    fn delete_message(&self, chat: ChatId, message: MessageId) -> impl Future<Output = Result<(), ChannelError>> + Send {
        (**self).delete_message(chat, message)
    }
}
