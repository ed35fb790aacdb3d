use serde::{Deserialize, Serialize};

/// Search criteria as extracted from free text. Either field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub area_code: Option<String>,
    pub max_price: Option<u64>,
}

/// Criteria with every gap filled from configured defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingQuery {
    pub area_code: String,
    pub max_price: u64,
}

impl SearchCriteria {
    pub fn resolve(&self, default_area_code: &str, default_max_price: u64) -> ListingQuery {
        let area_code = self
            .area_code
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(default_area_code)
            .to_string();
        ListingQuery { area_code, max_price: self.max_price.unwrap_or(default_max_price) }
    }
}

/// A read-only record returned by the listing-search provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyListing {
    pub status_text: Option<String>,
    pub price: Option<String>,
    pub address: Option<String>,
    pub beds: Option<String>,
    pub baths: Option<String>,
    pub area: Option<String>,
    pub detail_url: Option<String>,
    pub image_url: Option<String>,
}

/// Formats a whole-dollar amount with thousands separators, e.g. `300000` -> `300,000`.
pub fn format_price(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
