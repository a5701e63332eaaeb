//! Transaction categorization.
//!
//! User rules are tried first, in priority order. When none matches, a
//! static keyword table maps merchant and description words to category
//! name fragments.

pub mod keywords;
mod rules;

pub use keywords::{keyword_text, triggered_fragments, CATEGORY_KEYWORDS};
pub use rules::pattern_matches;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::ledger::{Categorizable, CategorizationRule, Category};
use crate::store::Store;

/// Read access to rules and categories.
pub trait CategorySource {
    /// Active rules owned by `user_id`.
    fn active_rules(&self, user_id: i64) -> Result<Vec<CategorizationRule>, StoreError>;

    /// First category (lowest id) whose name contains `fragment`, ignoring case.
    fn find_category_by_fragment(&self, fragment: &str) -> Result<Option<Category>, StoreError>;
}

impl CategorySource for Store {
    fn active_rules(&self, user_id: i64) -> Result<Vec<CategorizationRule>, StoreError> {
        self.list_active_rules(user_id)
    }

    fn find_category_by_fragment(&self, fragment: &str) -> Result<Option<Category>, StoreError> {
        self.find_category_by_name_fragment(fragment)
    }
}

/// Rule engine with keyword fallback.
pub struct Categorizer<'a, S: CategorySource + ?Sized> {
    source: &'a S,
}

impl<'a, S: CategorySource + ?Sized> Categorizer<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Pick a category for `item`, or `None` when nothing applies.
    pub fn categorize<C: Categorizable + ?Sized>(
        &self,
        item: &C,
        user_id: i64,
    ) -> Result<Option<i64>, StoreError> {
        let mut rules = self.source.active_rules(user_id)?;
        rules.retain(|r| r.is_active && r.user_id == user_id);
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

        if let Some(rule) = rules.iter().find(|rule| rule.matches(item)) {
            info!(
                "Matched rule '{}' (priority {}) -> category {}",
                rule.name, rule.priority, rule.category_id
            );
            return Ok(Some(rule.category_id));
        }

        let text = keyword_text(item.merchant(), item.description());
        for fragment in triggered_fragments(&text) {
            match self.source.find_category_by_fragment(fragment)? {
                Some(category) => {
                    info!("Categorized by keyword -> {} ({})", category.name, category.id);
                    return Ok(Some(category.id));
                }
                None => debug!("No category named like {:?}", fragment),
            }
        }

        debug!("Could not categorize {:?}", item.merchant());
        Ok(None)
    }
}

/// Outcome of a bulk categorization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub categorized: usize,
    pub considered: usize,
}

/// Categorize a user's transactions and persist the assignments.
pub fn bulk_categorize(
    store: &Store,
    user_id: i64,
    only_uncategorized: bool,
) -> Result<BulkOutcome, StoreError> {
    let transactions = store.list_transactions(user_id, only_uncategorized)?;
    let categorizer = Categorizer::new(store);

    let mut categorized = 0;
    for transaction in &transactions {
        if let Some(category_id) = categorizer.categorize(transaction, user_id)? {
            store.set_transaction_category(transaction.id, Some(category_id))?;
            categorized += 1;
        }
    }

    info!(
        "Categorized {} out of {} transactions for user {}",
        categorized,
        transactions.len(),
        user_id
    );

    Ok(BulkOutcome {
        categorized,
        considered: transactions.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ledger::{NewRule, RuleField, TransactionCandidate};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn candidate(user_id: i64, merchant: &str) -> TransactionCandidate {
        TransactionCandidate {
            user_id,
            document_id: None,
            category_id: None,
            date: NaiveDate::from_ymd_opt(2025, 11, 25).unwrap(),
            amount: Decimal::new(1108, 2),
            currency: "USD".to_string(),
            merchant: Some(merchant.to_string()),
            description: None,
            tax: None,
            is_expense: true,
            line_items: Vec::new(),
        }
    }

    fn add_rule(store: &Store, user_id: i64, category_id: i64, pattern: &str, priority: i64) -> i64 {
        store
            .create_rule(&NewRule {
                user_id,
                category_id,
                name: format!("{} rule", pattern),
                pattern: pattern.to_string(),
                field: RuleField::Merchant,
                priority,
                is_active: true,
            })
            .unwrap()
            .id
    }

    fn category_id(store: &Store, name: &str) -> i64 {
        store.find_category_by_name_fragment(name).unwrap().unwrap().id
    }

    #[test]
    fn test_highest_priority_rule_wins() {
        let store = Store::open_in_memory().unwrap();
        let user = store.create_user("a@example.com", "A").unwrap();
        let shopping = category_id(&store, "Shopping");
        let food = category_id(&store, "Food");

        add_rule(&store, user.id, food, "walmart", 1);
        add_rule(&store, user.id, shopping, "walmart", 100);

        let result = Categorizer::new(&store).categorize(&candidate(user.id, "Walmart"), user.id).unwrap();
        assert_eq!(result, Some(shopping));
    }

    #[test]
    fn test_priority_tie_goes_to_oldest_rule() {
        let store = Store::open_in_memory().unwrap();
        let user = store.create_user("a@example.com", "A").unwrap();
        let health = category_id(&store, "Health");
        let personal = category_id(&store, "Personal");

        add_rule(&store, user.id, health, "pharm", 5);
        add_rule(&store, user.id, personal, "pharm", 5);

        let result = Categorizer::new(&store).categorize(&candidate(user.id, "PharmaPlus"), user.id).unwrap();
        assert_eq!(result, Some(health));
    }

    #[test]
    fn test_inactive_and_foreign_rules_ignored() {
        let store = Store::open_in_memory().unwrap();
        let user = store.create_user("a@example.com", "A").unwrap();
        let other = store.create_user("b@example.com", "B").unwrap();
        let education = category_id(&store, "Education");

        add_rule(&store, other.id, education, "acme", 10);
        store
            .create_rule(&NewRule {
                user_id: user.id,
                category_id: education,
                name: "off".to_string(),
                pattern: "acme".to_string(),
                field: RuleField::Merchant,
                priority: 10,
                is_active: false,
            })
            .unwrap();

        let result = Categorizer::new(&store).categorize(&candidate(user.id, "ACME Corp"), user.id).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_keyword_fallback_finds_food_category() {
        let store = Store::open_in_memory().unwrap();
        let user = store.create_user("a@example.com", "A").unwrap();

        let result = Categorizer::new(&store).categorize(&candidate(user.id, "Pizza Hut"), user.id).unwrap();
        assert_eq!(result, Some(category_id(&store, "Food & Dining")));
    }

    #[test]
    fn test_keyword_fallback_without_matching_category() {
        struct Empty;

        impl CategorySource for Empty {
            fn active_rules(&self, _user_id: i64) -> Result<Vec<CategorizationRule>, StoreError> {
                Ok(Vec::new())
            }

            fn find_category_by_fragment(&self, _fragment: &str) -> Result<Option<Category>, StoreError> {
                Ok(None)
            }
        }

        let result = Categorizer::new(&Empty).categorize(&candidate(1, "Pizza Hut"), 1).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_keyword_lookup_continues_past_missing_categories() {
        struct OnlyTransport;

        impl CategorySource for OnlyTransport {
            fn active_rules(&self, _user_id: i64) -> Result<Vec<CategorizationRule>, StoreError> {
                Ok(Vec::new())
            }

            fn find_category_by_fragment(&self, fragment: &str) -> Result<Option<Category>, StoreError> {
                Ok((fragment == "transport").then(|| Category {
                    id: 2,
                    name: "Transport".to_string(),
                    parent_id: None,
                }))
            }
        }

        // "cafe" triggers food first, which has no category here.
        let result = Categorizer::new(&OnlyTransport)
            .categorize(&candidate(1, "Cafe near metro"), 1)
            .unwrap();
        assert_eq!(result, Some(2));
    }

    #[test]
    fn test_bulk_categorize() {
        let store = Store::open_in_memory().unwrap();
        let user = store.create_user("a@example.com", "A").unwrap();
        let transport = category_id(&store, "Transport");

        store.insert_transaction(&candidate(user.id, "Uber")).unwrap();
        store.insert_transaction(&candidate(user.id, "Mystery Vendor")).unwrap();
        let mut already = candidate(user.id, "Coffee Bar");
        already.category_id = Some(transport);
        store.insert_transaction(&already).unwrap();

        let outcome = bulk_categorize(&store, user.id, true).unwrap();
        assert_eq!(outcome, BulkOutcome { categorized: 1, considered: 2 });

        let outcome = bulk_categorize(&store, user.id, false).unwrap();
        assert_eq!(outcome, BulkOutcome { categorized: 2, considered: 3 });

        let food = category_id(&store, "Food");
        let categories: Vec<Option<i64>> = store
            .list_transactions(user.id, false)
            .unwrap()
            .into_iter()
            .map(|t| t.category_id)
            .collect();
        assert_eq!(categories, vec![Some(transport), None, Some(food)]);
    }
}
