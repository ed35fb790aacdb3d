use serde::{Deserialize, Serialize};

/// One text message received from the chat platform, scoped to a single relay run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub sender_id: i64,
    pub sender_first_name: String,
    pub sender_name: String,
    pub text: String,
}

impl InboundMessage {
    pub fn new(
        chat_id: i64,
        sender_id: i64,
        first_name: impl Into<String>,
        last_name: Option<&str>,
        text: impl Into<String>,
    ) -> Self {
        let first_name = first_name.into();
        let sender_name = display_name(&first_name, last_name);
        Self { chat_id, sender_id, sender_first_name: first_name, sender_name, text: text.into() }
    }
}

pub fn display_name(first_name: &str, last_name: Option<&str>) -> String {
    format!("{first_name} {}", last_name.unwrap_or_default()).trim().to_string()
}
