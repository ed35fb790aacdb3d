use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrmContactId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrmLeadId(pub u64);

/// Contact payload. The sender's platform id stands in for a phone number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewNote {
    pub contact_id: CrmContactId,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewLead {
    pub name: String,
    pub pipeline_id: Option<u64>,
    pub status_id: Option<u64>,
    pub contact_id: CrmContactId,
}

/// What the relay produced for one message, handed to CRM sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversationOutcome {
    Reply { reply: String },
    Search { area_code: String, max_price: u64, result_count: usize },
}

impl ConversationOutcome {
    pub fn note_text(&self, user_text: &str) -> String {
        match self {
            Self::Reply { reply } => {
                format!("Telegram Conversation:\nUser: {user_text}\nAI: {reply}")
            }
            Self::Search { area_code, max_price, result_count } => format!(
                "Telegram Property Search:\nUser: {user_text}\nArea: {area_code}\n\
                 Max price: {max_price}\nResults: {result_count}"
            ),
        }
    }
}
