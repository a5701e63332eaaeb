//! Static keyword fallback table.

/// Category-name fragments and their keyword triggers, in lookup order.
pub static CATEGORY_KEYWORDS: [(&str, &[&str]); 8] = [
    (
        "food",
        &[
            "restaurant",
            "cafe",
            "coffee",
            "pizza",
            "burger",
            "food",
            "grocery",
            "supermarket",
            "market",
        ],
    ),
    (
        "transport",
        &["uber", "lyft", "taxi", "gas", "fuel", "parking", "transit", "metro", "bus"],
    ),
    ("shopping", &["amazon", "ebay", "store", "shop", "mall", "outlet"]),
    (
        "entertainment",
        &["netflix", "spotify", "cinema", "movie", "theater", "game", "steam"],
    ),
    (
        "utilities",
        &["electric", "water", "gas", "internet", "phone", "mobile"],
    ),
    (
        "health",
        &["pharmacy", "doctor", "hospital", "clinic", "medical", "dentist"],
    ),
    ("rent", &["rent", "landlord", "lease"]),
    ("insurance", &["insurance", "premium"]),
];

/// Text the keyword table is matched against.
pub fn keyword_text(merchant: Option<&str>, description: Option<&str>) -> String {
    format!("{} {}", merchant.unwrap_or_default(), description.unwrap_or_default()).to_lowercase()
}

/// Category-name fragments triggered by `text`, in table order.
///
/// A fragment appears once per matching keyword, which mirrors how lookups
/// are retried when no category carries that fragment.
pub fn triggered_fragments(text: &str) -> impl Iterator<Item = &'static str> + '_ {
    CATEGORY_KEYWORDS.iter().flat_map(move |(fragment, keywords)| {
        keywords
            .iter()
            .filter(move |keyword| text.contains(*keyword))
            .map(move |_| *fragment)
    })
}
