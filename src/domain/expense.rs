use crate::domain::error::ValidationError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub category: String,
    pub amount: Amount,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upper bound for a single expense. Keeps per-category sums far from
/// `Decimal::MAX`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// A strictly positive, currency-agnostic amount.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, PartialOrd)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
        if value > Decimal::from(MAX_AMOUNT) {
            return Err(ValidationError::AmountTooLarge { max: MAX_AMOUNT });
        }
        Ok(Amount(value))
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Trims surrounding whitespace. Case is preserved, so "Food" and "food" stay
/// distinct categories.
pub fn normalize_category(raw: &str) -> Result<String, ValidationError> {
    let category = raw.trim();
    if category.is_empty() {
        return Err(ValidationError::EmptyCategory);
    }
    Ok(category.to_string())
}

/// Blank comments are stored as `None`.
pub fn normalize_comment(raw: Option<String>) -> Option<String> {
    raw.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewExpense {
    pub category: String,
    pub amount: Decimal,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Partial update. Absent fields are left untouched; an empty `comment`
/// clears the stored comment.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ExpenseChanges {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub comment: Option<String>,
}
