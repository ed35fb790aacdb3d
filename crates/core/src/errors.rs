use std::fmt;

use thiserror::Error;

/// External collaborators the relay talks to over HTTP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upstream {
    Completion,
    Messaging,
    Crm,
    OAuth,
    Listings,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completion => "completion",
            Self::Messaging => "messaging",
            Self::Crm => "crm",
            Self::OAuth => "oauth",
            Self::Listings => "listings",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("{service} request failed: {message}")]
    Transport { service: Upstream, message: String },
    #[error("{service} returned status {status}: {body}")]
    Status { service: Upstream, status: u16, body: String },
    #[error("{service} response could not be decoded: {message}")]
    Decode { service: Upstream, message: String },
}

impl UpstreamError {
    pub fn transport(service: Upstream, error: impl fmt::Display) -> Self {
        Self::Transport { service, message: error.to_string() }
    }

    pub fn decode(service: Upstream, error: impl fmt::Display) -> Self {
        Self::Decode { service, message: error.to_string() }
    }

    /// Builds a status error, keeping at most 512 bytes of the response body.
    pub fn status(service: Upstream, status: u16, body: &str) -> Self {
        Self::Status { service, status, body: truncate_body(body, 512) }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("authorization code missing from oauth callback")]
    MissingCode,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("crm rejected the access token")]
    AuthExpired,
    #[error("structured output could not be parsed: {0}")]
    ExtractionParse(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("token storage failure: {0}")]
    Storage(String),
}

impl RelayError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingCode => "Authorization failed: No code received from the CRM.",
            Self::Upstream(_) => {
                "An external service is temporarily unavailable. Please retry shortly."
            }
            Self::AuthExpired => "The CRM connection has expired. Reconnect it via /auth.",
            Self::ExtractionParse(_) => "The request could not be understood. Please rephrase it.",
            Self::Configuration(_) | Self::Storage(_) => "An unexpected internal error occurred.",
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }
}

fn truncate_body(body: &str, max_bytes: usize) -> String {
    if body.len() <= max_bytes {
        return body.to_string();
    }
    let mut end = max_bytes;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
