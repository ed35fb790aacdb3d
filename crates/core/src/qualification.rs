/// Decides whether a conversation should become a CRM lead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeadPolicy {
    /// Create a lead when the user's text contains any keyword, case-insensitively.
    Keywords(Vec<String>),
    /// Every conversation is a lead. Used by listing search.
    Always,
}

impl LeadPolicy {
    pub fn keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Keywords(
            keywords
                .into_iter()
                .map(|keyword| keyword.as_ref().trim().to_lowercase())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
        )
    }

    /// Returns the reason the text qualifies, or `None`.
    pub fn qualify(&self, text: &str) -> Option<&str> {
        match self {
            Self::Always => Some("always"),
            Self::Keywords(keywords) => {
                let lowered = text.to_lowercase();
                keywords
                    .iter()
                    .find(|keyword| lowered.contains(keyword.as_str()))
                    .map(String::as_str)
            }
        }
    }
}

pub const DEFAULT_LEAD_KEYWORDS: &[&str] = &["buy", "interested", "budget", "viewing"];
