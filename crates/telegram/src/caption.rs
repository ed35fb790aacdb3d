use leadrelay_core::PropertyListing;

/// Characters with special meaning in Telegram MarkdownV2.
const MARKDOWN_V2_SPECIAL: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for ch in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// MarkdownV2 caption for a listing photo. Every field value is escaped.
pub fn listing_caption(listing: &PropertyListing) -> String {
    let field = |value: &Option<String>, fallback: &str| {
        escape_markdown_v2(
            value.as_deref().map(str::trim).filter(|v| !v.is_empty()).unwrap_or(fallback),
        )
    };

    let mut lines = vec![
        format!("*{}*", field(&listing.status_text, "For sale")),
        format!("💰 {}", field(&listing.price, "Price on request")),
        format!("📍 {}", field(&listing.address, "Address unavailable")),
        format!(
            "🛏 {} bd \\| 🛁 {} ba \\| 📐 {} sqft",
            field(&listing.beds, "?"),
            field(&listing.baths, "?"),
            field(&listing.area, "?"),
        ),
    ];
    if let Some(url) = listing.detail_url.as_deref().filter(|url| !url.trim().is_empty()) {
        lines.push(format!("🔗 {}", escape_markdown_v2(url.trim())));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use leadrelay_core::PropertyListing;

    use super::{escape_markdown_v2, listing_caption};

    #[test]
    fn escapes_every_special_character() {
        assert_eq!(escape_markdown_v2("plain text"), "plain text");
        assert_eq!(escape_markdown_v2("1.5-bath!"), "1\\.5\\-bath\\!");
        assert_eq!(escape_markdown_v2("a_b*c[d](e)~f`g>h#i+j=k|l{m}n"),
            "a\\_b\\*c\\[d\\]\\(e\\)\\~f\\`g\\>h\\#i\\+j\\=k\\|l\\{m\\}n");
        assert_eq!(escape_markdown_v2("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn caption_escapes_listing_fields() {
        let listing = PropertyListing {
            status_text: Some("House for sale!".to_string()),
            price: Some("$299,000".to_string()),
            address: Some("12 N.W. 1st St, Miami-Dade, FL 33101".to_string()),
            beds: Some("2".to_string()),
            baths: Some("1.5".to_string()),
            area: Some("950".to_string()),
            detail_url: Some("https://www.zillow.com/homedetails/12-nw-1st-st/1_zpid/".to_string()),
            image_url: None,
        };

        let caption = listing_caption(&listing);

        assert!(caption.starts_with("*House for sale\\!*\n"));
        assert!(caption.contains("💰 $299,000"));
        assert!(caption.contains("📍 12 N\\.W\\. 1st St, Miami\\-Dade, FL 33101"));
        assert!(caption.contains("🛏 2 bd \\| 🛁 1\\.5 ba \\| 📐 950 sqft"));
        let escaped_url = "https://www\\.zillow\\.com/homedetails/12\\-nw\\-1st\\-st/1\\_zpid/";
        assert!(caption.contains(escaped_url));
    }

    #[test]
    fn caption_uses_placeholders_for_missing_fields() {
        let caption = listing_caption(&PropertyListing::default());

        assert!(caption.starts_with("*For sale*"));
        assert!(caption.contains("Price on request"));
        assert!(caption.contains("🛏 ? bd"));
        assert!(!caption.contains("🔗"));
    }
}
