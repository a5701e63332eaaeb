//! Users, categories, categorization rules, and transactions.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::receipt::{LineItemCandidate, ParsedFields};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
}

/// Expense/income category. Names are unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

/// The transaction field a rule inspects.
///
/// Only `merchant` and `description` can ever match; any other stored
/// field name is kept verbatim and never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleField {
    Merchant,
    Description,
    Other(String),
}

impl RuleField {
    pub fn parse(s: &str) -> Self {
        match s {
            "merchant" => RuleField::Merchant,
            "description" => RuleField::Description,
            other => RuleField::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RuleField::Merchant => "merchant",
            RuleField::Description => "description",
            RuleField::Other(s) => s,
        }
    }
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-defined pattern-to-category mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizationRule {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub name: String,
    /// Regex, or a plain substring when it does not compile.
    pub pattern: String,
    pub field: RuleField,
    /// Higher wins.
    pub priority: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewRule {
    pub user_id: i64,
    pub category_id: i64,
    pub name: String,
    pub pattern: String,
    pub field: RuleField,
    pub priority: i64,
    pub is_active: bool,
}

/// Anything with a merchant and a description can be categorized.
pub trait Categorizable {
    fn merchant(&self) -> Option<&str>;
    fn description(&self) -> Option<&str>;
}

/// A persisted financial transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,
    pub is_expense: bool,
    pub created_at: DateTime<Utc>,
}

impl Categorizable for Transaction {
    fn merchant(&self) -> Option<&str> {
        self.merchant.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// A transaction that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCandidate {
    pub user_id: i64,
    pub document_id: Option<i64>,
    pub category_id: Option<i64>,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
    pub merchant: Option<String>,
    pub description: Option<String>,
    pub tax: Option<Decimal>,
    pub is_expense: bool,
    pub line_items: Vec<LineItemCandidate>,
}

impl TransactionCandidate {
    /// Build a candidate from parsed receipt fields.
    ///
    /// Returns `None` unless a non-zero amount and a date were parsed. The
    /// parser cannot tell income from expenses, so the candidate is always
    /// an expense.
    pub fn from_parsed(parsed: &ParsedFields, user_id: i64, document_id: Option<i64>) -> Option<Self> {
        if !parsed.has_transaction_fields() {
            return None;
        }
        let (Some(amount), Some(date)) = (parsed.amount, parsed.date) else {
            return None;
        };

        Some(Self {
            user_id,
            document_id,
            category_id: None,
            date,
            amount,
            currency: parsed.currency.clone(),
            merchant: parsed.merchant.clone(),
            description: None,
            tax: parsed.tax,
            is_expense: true,
            line_items: parsed.line_items.clone(),
        })
    }
}

impl Categorizable for TransactionCandidate {
    fn merchant(&self) -> Option<&str> {
        self.merchant.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// A persisted line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    pub transaction_id: i64,
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}
