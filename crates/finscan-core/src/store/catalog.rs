//! Users, categories, and categorization rules.

use rusqlite::{params, OptionalExtension, Row};

use super::Store;
use crate::error::StoreError;
use crate::models::ledger::{CategorizationRule, Category, NewRule, RuleField, User};

const RULE_COLUMNS: &str = "id, user_id, category_id, name, pattern, field, priority, is_active";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
    })
}

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<CategorizationRule> {
    let field: String = row.get(5)?;
    Ok(CategorizationRule {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        name: row.get(3)?,
        pattern: row.get(4)?,
        field: RuleField::parse(&field),
        priority: row.get(6)?,
        is_active: row.get(7)?,
    })
}

impl Store {
    pub fn create_user(&self, email: &str, full_name: &str) -> Result<User, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (email, full_name) VALUES (?1, ?2)",
                params![email, full_name],
            )?;
            Ok(User {
                id: conn.last_insert_rowid(),
                email: email.to_string(),
                full_name: full_name.to_string(),
            })
        })
    }

    /// Return the user with `email`, creating it if it does not exist.
    pub fn ensure_user(&self, email: &str, full_name: &str) -> Result<User, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (email, full_name) VALUES (?1, ?2)",
                params![email, full_name],
            )?;
            let user = conn.query_row(
                "SELECT id, email, full_name FROM users WHERE email = ?1",
                params![email],
                user_from_row,
            )?;
            Ok(user)
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT id, email, full_name FROM users WHERE id = ?1",
                    params![id],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    pub fn create_category(&self, name: &str, parent_id: Option<i64>) -> Result<Category, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO categories (name, parent_id) VALUES (?1, ?2)",
                params![name, parent_id],
            )?;
            Ok(Category {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                parent_id,
            })
        })
    }

    pub fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, parent_id FROM categories ORDER BY id")?;
            let categories = stmt
                .query_map([], category_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(categories)
        })
    }

    /// First category (lowest id) whose name contains `fragment`, ignoring ASCII case.
    pub fn find_category_by_name_fragment(&self, fragment: &str) -> Result<Option<Category>, StoreError> {
        self.with_conn(|conn| {
            let category = conn
                .query_row(
                    "SELECT id, name, parent_id FROM categories
                     WHERE instr(lower(name), lower(?1)) > 0
                     ORDER BY id LIMIT 1",
                    params![fragment],
                    category_from_row,
                )
                .optional()?;
            Ok(category)
        })
    }

    pub fn create_rule(&self, rule: &NewRule) -> Result<CategorizationRule, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO rules (user_id, category_id, name, pattern, field, priority, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    rule.user_id,
                    rule.category_id,
                    rule.name,
                    rule.pattern,
                    rule.field.as_str(),
                    rule.priority,
                    rule.is_active,
                ],
            )?;
            Ok(CategorizationRule {
                id: conn.last_insert_rowid(),
                user_id: rule.user_id,
                category_id: rule.category_id,
                name: rule.name.clone(),
                pattern: rule.pattern.clone(),
                field: rule.field.clone(),
                priority: rule.priority,
                is_active: rule.is_active,
            })
        })
    }

    /// Active rules for `user_id`, highest priority first, oldest first on ties.
    pub fn list_active_rules(&self, user_id: i64) -> Result<Vec<CategorizationRule>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {RULE_COLUMNS} FROM rules
                 WHERE user_id = ?1 AND is_active = 1
                 ORDER BY priority DESC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rules = stmt
                .query_map(params![user_id], rule_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rules)
        })
    }

    pub fn list_rules(&self, user_id: i64) -> Result<Vec<CategorizationRule>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {RULE_COLUMNS} FROM rules WHERE user_id = ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rules = stmt
                .query_map(params![user_id], rule_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rules)
        })
    }

    /// Enable or disable a rule owned by `user_id`.
    pub fn set_rule_active(&self, user_id: i64, rule_id: i64, active: bool) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE rules SET is_active = ?1 WHERE id = ?2 AND user_id = ?3",
                params![active, rule_id, user_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound {
                    entity: "rule",
                    id: rule_id,
                });
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rule(user_id: i64, pattern: &str, priority: i64, is_active: bool) -> NewRule {
        NewRule {
            user_id,
            category_id: 1,
            name: pattern.to_string(),
            pattern: pattern.to_string(),
            field: RuleField::Merchant,
            priority,
            is_active,
        }
    }

    #[test]
    fn test_user_email_is_unique() {
        let store = Store::open_in_memory().unwrap();
        store.create_user("a@example.com", "A").unwrap();
        assert!(store.create_user("a@example.com", "Again").is_err());
    }

    #[test]
    fn test_ensure_user_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let first = store.ensure_user("me@localhost", "Me").unwrap();
        let second = store.ensure_user("me@localhost", "Someone else").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.full_name, "Me");
    }

    #[test]
    fn test_find_category_by_fragment_is_case_insensitive() {
        let store = Store::open_in_memory().unwrap();

        let food = store.find_category_by_name_fragment("FOOD").unwrap().unwrap();
        assert_eq!(food.name, "Food & Dining");
        assert_eq!(food.id, 1);

        // "Fast Food" also matches but has a higher id.
        let fast = store.find_category_by_name_fragment("fast").unwrap().unwrap();
        assert_eq!(fast.parent_id, Some(1));

        assert!(store.find_category_by_name_fragment("insurance").unwrap().is_some());
        assert!(store.find_category_by_name_fragment("crypto").unwrap().is_none());
    }

    #[test]
    fn test_category_names_are_unique() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.create_category("Transport", None).is_err());

        let pets = store.create_category("Pets", None).unwrap();
        assert!(store.list_categories().unwrap().contains(&pets));
    }

    #[test]
    fn test_active_rules_ordering() {
        let store = Store::open_in_memory().unwrap();
        let user = store.create_user("a@example.com", "A").unwrap();

        store.create_rule(&rule(user.id, "low", 1, true)).unwrap();
        store.create_rule(&rule(user.id, "high", 50, true)).unwrap();
        store.create_rule(&rule(user.id, "tie", 1, true)).unwrap();
        store.create_rule(&rule(user.id, "off", 99, false)).unwrap();

        let patterns: Vec<String> = store
            .list_active_rules(user.id)
            .unwrap()
            .into_iter()
            .map(|r| r.pattern)
            .collect();
        assert_eq!(patterns, vec!["high", "low", "tie"]);
        assert_eq!(store.list_rules(user.id).unwrap().len(), 4);
    }

    #[test]
    fn test_set_rule_active_checks_owner() {
        let store = Store::open_in_memory().unwrap();
        let owner = store.create_user("a@example.com", "A").unwrap();
        let other = store.create_user("b@example.com", "B").unwrap();
        let created = store.create_rule(&rule(owner.id, "x", 0, true)).unwrap();

        assert!(matches!(
            store.set_rule_active(other.id, created.id, false),
            Err(StoreError::NotFound { entity: "rule", .. })
        ));

        store.set_rule_active(owner.id, created.id, false).unwrap();
        assert!(store.list_active_rules(owner.id).unwrap().is_empty());
    }
}
