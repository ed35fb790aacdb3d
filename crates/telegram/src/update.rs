use leadrelay_core::InboundMessage;
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl Update {
    /// The text message carried by this update, if there is one.
    ///
    /// Delivery receipts, edits, stickers and other non-text content yield `None`.
    pub fn inbound_message(&self) -> Option<InboundMessage> {
        let message = self.message.as_ref()?;
        let text = message.text.as_deref().filter(|text| !text.is_empty())?;

        let (sender_id, first_name, last_name) = match &message.from {
            Some(user) => (user.id, user.first_name.as_str(), user.last_name.as_deref()),
            None => (message.chat.id, "", None),
        };
        let first_name = if first_name.trim().is_empty() { "Telegram user" } else { first_name };

        Some(InboundMessage::new(message.chat.id, sender_id, first_name, last_name, text))
    }
}

/// Decodes a raw webhook body. Undecodable bodies become an empty update, never an error.
pub fn decode_update(body: &[u8]) -> Update {
    serde_json::from_slice(body).unwrap_or_default()
}
