use std::sync::Arc;

use leadrelay_core::{RelayError, SearchCriteria};
use serde_json::{Map, Value};

use crate::llm::{CompletionRequest, LlmClient};

pub const FALLBACK_GREETING: &str =
    "Hello! I'm your real estate AI assistant. How can I help you find a property today?";

const AGENT_PERSONA: &str = "Act as a friendly real estate agent. Respond helpfully to the \
client's message and ask one question to learn more about their needs (like budget, location, \
or type of home). Keep it short.";

const CRITERIA_INSTRUCTIONS: &str = "You extract property search criteria from a client's \
message. Reply with a single JSON object and nothing else, shaped as \
{\"area_code\": string or null, \"max_price\": number or null}. area_code is the US ZIP code \
of the area the client wants; infer it from a city or neighbourhood name when you can. \
max_price is the client's budget ceiling in whole US dollars. Use null for anything the \
message does not state.";

/// Turns a client's free text into either a persona reply or search criteria.
#[derive(Clone)]
pub struct ConversationAgent {
    llm: Arc<dyn LlmClient>,
}

impl ConversationAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Persona reply. Callers substitute [`FALLBACK_GREETING`] on error.
    pub async fn reply(&self, user_text: &str) -> Result<String, RelayError> {
        let prompt = format!("A client texted this: \"{user_text}\"");
        let request = CompletionRequest::text(AGENT_PERSONA, prompt);
        self.llm.complete(&request).await
    }

    /// Structured criteria. Fails with `ExtractionParse` when the model's output is unusable.
    pub async fn extract_criteria(&self, user_text: &str) -> Result<SearchCriteria, RelayError> {
        let request = CompletionRequest::json(CRITERIA_INSTRUCTIONS, user_text);
        let raw = self.llm.complete(&request).await?;
        parse_criteria(&raw)
    }
}

/// Parses model output as untrusted JSON into [`SearchCriteria`].
pub fn parse_criteria(raw: &str) -> Result<SearchCriteria, RelayError> {
    let body = json_object_slice(raw)
        .ok_or_else(|| RelayError::ExtractionParse("no JSON object in model output".to_string()))?;
    let value: Value = serde_json::from_str(body)
        .map_err(|error| RelayError::ExtractionParse(error.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| {
            RelayError::ExtractionParse("model output is not a JSON object".to_string())
        })?;

    Ok(SearchCriteria {
        area_code: area_code_field(object)?,
        max_price: max_price_field(object)?,
    })
}

fn json_object_slice(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| object.get(*name)).filter(|value| !value.is_null())
}

fn area_code_field(object: &Map<String, Value>) -> Result<Option<String>, RelayError> {
    match field(object, &["area_code", "zip_code", "zip"]) {
        None => Ok(None),
        Some(Value::String(text)) => {
            let text = text.trim();
            Ok((!text.is_empty()).then(|| text.to_string()))
        }
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => {
            Err(RelayError::ExtractionParse(format!("area_code has unexpected value {other}")))
        }
    }
}

fn max_price_field(object: &Map<String, Value>) -> Result<Option<u64>, RelayError> {
    match field(object, &["max_price", "price_max", "budget"]) {
        None => Ok(None),
        Some(Value::Number(number)) => match number.as_f64() {
            Some(amount) if amount.is_finite() && amount >= 0.0 => Ok(Some(amount.round() as u64)),
            _ => Err(RelayError::ExtractionParse(format!(
                "max_price {number} is not a valid amount"
            ))),
        },
        Some(Value::String(text)) => parse_price_text(text).map(Some),
        Some(other) => {
            Err(RelayError::ExtractionParse(format!("max_price has unexpected value {other}")))
        }
    }
}

/// Accepts amounts like `300000`, `$300,000`, `300k` or `1.2M`.
fn parse_price_text(text: &str) -> Result<u64, RelayError> {
    let cleaned: String =
        text.chars().filter(|ch| !matches!(ch, '$' | ',' | '_') && !ch.is_whitespace()).collect();
    let (number, multiplier) = match cleaned.chars().last() {
        Some('k' | 'K') => (&cleaned[..cleaned.len() - 1], 1_000.0),
        Some('m' | 'M') => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };
    match number.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => {
            Ok((amount * multiplier).round() as u64)
        }
        _ => Err(RelayError::ExtractionParse(format!("max_price `{text}` is not a valid amount"))),
    }
}
