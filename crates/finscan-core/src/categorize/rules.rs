//! User rule matching.

use regex::Regex;
use tracing::debug;

use crate::models::ledger::{CategorizationRule, Categorizable, RuleField};

impl CategorizationRule {
    /// Whether this rule matches the item's targeted field.
    ///
    /// Pattern and value are lowercased. Patterns that are not valid regex
    /// are treated as plain substrings. Fields other than `merchant` and
    /// `description` never match.
    pub fn matches<C: Categorizable + ?Sized>(&self, item: &C) -> bool {
        let value = match &self.field {
            RuleField::Merchant => item.merchant(),
            RuleField::Description => item.description(),
            RuleField::Other(_) => return false,
        };

        pattern_matches(&self.pattern, value.unwrap_or_default())
    }
}

/// Case-insensitive regex search with substring fallback.
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let value = value.to_lowercase();

    match Regex::new(&pattern) {
        Ok(re) => re.is_match(&value),
        Err(e) => {
            debug!("Rule pattern {:?} is not a valid regex ({}), using substring match", pattern, e);
            value.contains(&pattern)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        merchant: Option<&'static str>,
        description: Option<&'static str>,
    }

    impl Categorizable for Item {
        fn merchant(&self) -> Option<&str> {
            self.merchant
        }

        fn description(&self) -> Option<&str> {
            self.description
        }
    }

    fn rule(pattern: &str, field: RuleField) -> CategorizationRule {
        CategorizationRule {
            id: 1,
            user_id: 1,
            category_id: 1,
            name: "test".to_string(),
            pattern: pattern.to_string(),
            field,
            priority: 0,
            is_active: true,
        }
    }

    #[test]
    fn test_regex_is_case_insensitive() {
        let item = Item {
            merchant: Some("WALMART Supercenter #42"),
            description: None,
        };

        assert!(rule("^walmart", RuleField::Merchant).matches(&item));
        assert!(rule("Super(center|store)", RuleField::Merchant).matches(&item));
        assert!(!rule("target", RuleField::Merchant).matches(&item));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_substring() {
        let item = Item {
            merchant: Some("Shop (Downtown"),
            description: None,
        };

        assert!(rule("(downtown", RuleField::Merchant).matches(&item));
        assert!(!rule("(uptown", RuleField::Merchant).matches(&item));
    }

    #[test]
    fn test_targets_only_named_field() {
        let item = Item {
            merchant: Some("Netflix"),
            description: Some("monthly subscription"),
        };

        assert!(rule("subscription", RuleField::Description).matches(&item));
        assert!(!rule("netflix", RuleField::Description).matches(&item));
    }

    #[test]
    fn test_unknown_field_never_matches() {
        let item = Item {
            merchant: Some("anything"),
            description: Some("anything"),
        };

        assert!(!rule(".*", RuleField::Other("amount".to_string())).matches(&item));
    }

    #[test]
    fn test_missing_field_is_empty() {
        let item = Item {
            merchant: None,
            description: None,
        };

        assert!(rule("^$", RuleField::Merchant).matches(&item));
        assert!(!rule("x", RuleField::Merchant).matches(&item));
    }
}
