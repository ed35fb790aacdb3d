//! Language-model side of the relay.
//!
//! - `llm` - the `LlmClient` seam and the request shape
//! - `openai` - OpenAI-compatible `/chat/completions` client
//! - `conversation` - the real-estate persona reply and search-criteria extraction
//!
//! The model only writes prose or proposes criteria. Criteria output is parsed
//! as untrusted input; anything unusable surfaces as `RelayError::ExtractionParse`.

pub mod conversation;
pub mod llm;
pub mod openai;

pub use conversation::{parse_criteria, ConversationAgent, FALLBACK_GREETING};
pub use llm::{CompletionRequest, LlmClient};
pub use openai::OpenAiClient;
