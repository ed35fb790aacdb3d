use async_trait::async_trait;
use leadrelay_core::{RelayError, Upstream, UpstreamError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), RelayError>;

    /// Sends a photo by URL with a MarkdownV2 caption. The caption must already be escaped.
    async fn send_photo(&self, chat_id: i64, photo_url: &str, caption: &str)
        -> Result<(), RelayError>;
}

/// Bot API client over plain HTTPS.
#[derive(Clone)]
pub struct TelegramBotClient {
    client: Client,
    api_base_url: String,
    bot_token: SecretString,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Serialize)]
struct SendPhotoRequest<'a> {
    chat_id: i64,
    photo: &'a str,
    caption: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramBotClient {
    pub fn new(client: Client, api_base_url: impl Into<String>, bot_token: SecretString) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        Self { client, api_base_url, bot_token }
    }

    async fn call<T: Serialize + Sync>(&self, method: &str, payload: &T) -> Result<(), RelayError> {
        let url = format!("{}/bot{}/{method}", self.api_base_url, self.bot_token.expose_secret());
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            // reqwest errors carry the URL, which embeds the bot token.
            .map_err(|error| UpstreamError::transport(Upstream::Messaging, error.without_url()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(UpstreamError::status(Upstream::Messaging, status.as_u16(), &body).into());
        }

        let parsed: BotApiResponse = serde_json::from_str(&body)
            .map_err(|error| UpstreamError::decode(Upstream::Messaging, error))?;
        if !parsed.ok {
            let description = parsed.description.unwrap_or_else(|| "ok=false".to_string());
            return Err(
                UpstreamError::status(Upstream::Messaging, status.as_u16(), &description).into()
            );
        }

        debug!(method, "telegram call succeeded");
        Ok(())
    }
}

#[async_trait]
impl ChatClient for TelegramBotClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), RelayError> {
        self.call("sendMessage", &SendMessageRequest { chat_id, text }).await
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), RelayError> {
        self.call(
            "sendPhoto",
            &SendPhotoRequest { chat_id, photo: photo_url, caption, parse_mode: "MarkdownV2" },
        )
        .await
    }
}
