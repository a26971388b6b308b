//! Telegram Bot API channel.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::core::{classify, parse_retry_after};
use crate::data::{ChatId, DeliveryReference, Media, MessageId};
use crate::effects::channel::Channel;
use crate::error::ChannelError;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<ApiResult>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

/// `result` is a message for sends, `true` for edits and deletes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiResult {
    Message(SentMessage),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    #[serde(default)]
    message_id: Option<i64>,
    #[serde(default)]
    photo: Vec<PhotoSize>,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// A bot account talking to the Bot API.
#[derive(Clone)]
pub struct TelegramChannel {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TelegramChannel {
    pub fn new(client: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
        }
    }

    /// Point the channel at another API root (a local bot server, a test mock).
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    async fn call(&self, request: reqwest::RequestBuilder) -> Result<Option<SentMessage>, ChannelError> {
        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::Transient(format!("telegram: {e}")))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ChannelError::Transient(format!("telegram: {e}")))?;

        let Ok(parsed) = serde_json::from_slice::<ApiResponse>(&body) else {
            return Err(classify(&format!("telegram: unexpected response (HTTP {})", status.as_u16())));
        };

        if parsed.ok {
            return Ok(match parsed.result {
                Some(ApiResult::Message(message)) => Some(message),
                _ => None,
            });
        }

        let description = parsed.description.unwrap_or_default();
        let code = parsed.error_code.unwrap_or(status.as_u16());
        debug!(code, %description, "telegram request failed");

        if code == 429 || description.contains("retry after") {
            let retry_after = parsed
                .parameters
                .and_then(|p| p.retry_after)
                .map(Duration::from_secs)
                .or_else(|| parse_retry_after(&description));
            return Err(ChannelError::throttled(retry_after));
        }

        Err(ChannelError::Transient(format!("telegram: {description} ({code})")))
    }
}

impl Channel for TelegramChannel {
    async fn send_media(
        &self,
        chat: ChatId,
        media: Media,
        caption: Option<String>,
    ) -> Result<Option<DeliveryReference>, ChannelError> {
        let url = self.method_url("sendPhoto");
        let request = match media {
            Media::Upload(payload) => {
                let part = Part::bytes(payload.to_vec())
                    .file_name("cover.jpg")
                    .mime_str("image/jpeg")
                    .map_err(|e| ChannelError::Transient(e.to_string()))?;
                let mut form = Form::new().text("chat_id", chat.to_string()).part("photo", part);
                if let Some(caption) = caption {
                    form = form.text("caption", caption);
                }
                self.client.post(url).multipart(form)
            }
            Media::Reference(reference) => {
                let mut body = json!({ "chat_id": chat.0, "photo": reference.as_str() });
                if let Some(caption) = caption {
                    body["caption"] = json!(caption);
                }
                self.client.post(url).json(&body)
            }
        };

        let sent = self.call(request).await?;
        // The last size is the largest; its id re-sends the original upload.
        Ok(sent
            .and_then(|m| m.photo.into_iter().last())
            .map(|p| DeliveryReference::new(p.file_id)))
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<Option<MessageId>, ChannelError> {
        let request = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({ "chat_id": chat.0, "text": text }));
        let sent = self.call(request).await?;
        Ok(sent.and_then(|m| m.message_id).map(MessageId))
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<(), ChannelError> {
        let request = self
            .client
            .post(self.method_url("editMessageText"))
            .json(&json!({ "chat_id": chat.0, "message_id": message.0, "text": text }));
        self.call(request).await.map(|_| ())
    }

    async fn delete_message(&self, chat: ChatId, message: MessageId) -> Result<(), ChannelError> {
        let request = self
            .client
            .post(self.method_url("deleteMessage"))
            .json(&json!({ "chat_id": chat.0, "message_id": message.0 }));
        self.call(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    fn channel(server: &MockServer) -> TelegramChannel {
        TelegramChannel::new(reqwest::Client::new(), "T0KEN").with_api_url(server.base_url())
    }

    #[tokio::test]
    async fn test_upload_returns_largest_file_id() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/botT0KEN/sendPhoto");
                then.status(200).json_body(serde_json::json!({
                    "ok": true,
                    "result": { "photo": [{ "file_id": "small" }, { "file_id": "large" }] }
                }));
            })
            .await;

        let reference = channel(&server)
            .send_media(ChatId(-100), Media::Upload(bytes::Bytes::from_static(b"jpg")), None)
            .await
            .unwrap();

        assert_eq!(reference, Some(DeliveryReference::new("large")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resend_by_reference_with_caption() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/botT0KEN/sendPhoto")
                    .json_body(serde_json::json!({ "chat_id": 42, "photo": "abc", "caption": "1/3" }));
                then.status(200).json_body(serde_json::json!({ "ok": true, "result": {} }));
            })
            .await;

        let reference = channel(&server)
            .send_media(ChatId(42), Media::Reference(DeliveryReference::new("abc")), Some("1/3".into()))
            .await
            .unwrap();

        assert_eq!(reference, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_message_lifecycle() {
        let server = MockServer::start_async().await;
        let send = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/botT0KEN/sendMessage")
                    .json_body(serde_json::json!({ "chat_id": 42, "text": "working" }));
                then.status(200)
                    .json_body(serde_json::json!({ "ok": true, "result": { "message_id": 9, "text": "working" } }));
            })
            .await;
        let edit = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/botT0KEN/editMessageText")
                    .json_body(serde_json::json!({ "chat_id": 42, "message_id": 9, "text": "1/2" }));
                then.status(200)
                    .json_body(serde_json::json!({ "ok": true, "result": { "message_id": 9 } }));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/botT0KEN/deleteMessage")
                    .json_body(serde_json::json!({ "chat_id": 42, "message_id": 9 }));
                then.status(200).json_body(serde_json::json!({ "ok": true, "result": true }));
            })
            .await;

        let channel = channel(&server);
        let id = channel.send_text(ChatId(42), "working").await.unwrap();
        assert_eq!(id, Some(MessageId(9)));
        channel.edit_text(ChatId(42), MessageId(9), "1/2").await.unwrap();
        channel.delete_message(ChatId(42), MessageId(9)).await.unwrap();

        send.assert_async().await;
        edit.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_flood_wait_is_throttle() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/botT0KEN/sendMessage");
                then.status(429).json_body(serde_json::json!({
                    "ok": false,
                    "error_code": 429,
                    "description": "Too Many Requests: retry after 7",
                    "parameters": { "retry_after": 7 }
                }));
            })
            .await;

        let err = channel(&server).send_text(ChatId(42), "hi").await.unwrap_err();

        assert_eq!(err, ChannelError::throttled(Some(Duration::from_secs(7))));
    }

    #[tokio::test]
    async fn test_other_failures_are_transient() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/botT0KEN/sendMessage");
                then.status(400).json_body(serde_json::json!({
                    "ok": false,
                    "error_code": 400,
                    "description": "Bad Request: chat not found"
                }));
            })
            .await;

        let err = channel(&server).send_text(ChatId(42), "hi").await.unwrap_err();

        assert!(matches!(err, ChannelError::Transient(msg) if msg.contains("chat not found")));
    }
}
