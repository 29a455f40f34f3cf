use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Total for category {category:?} is out of range")]
pub struct TotalOverflow {
    pub category: String,
}

/// Per-category sums for one owner, iterated alphabetically by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotals(BTreeMap<String, Decimal>);

impl CategoryTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaves the running total untouched when the sum would overflow.
    pub fn add(&mut self, category: &str, amount: Decimal) -> Result<(), TotalOverflow> {
        let total = self.0.entry(category.to_string()).or_insert(Decimal::ZERO);
        *total = total.checked_add(amount).ok_or_else(|| TotalOverflow {
            category: category.to_string(),
        })?;
        Ok(())
    }

    pub fn get(&self, category: &str) -> Option<Decimal> {
        self.0.get(category).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Decimal)> {
        self.0.iter()
    }
}

/// Payload for the pie chart. `has_data` is false when the owner has no
/// expenses so the renderer can show an empty state instead of a blank chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub has_data: bool,
}

impl From<&CategoryTotals> for ChartData {
    fn from(totals: &CategoryTotals) -> Self {
        let (labels, values) = totals
            .iter()
            .map(|(category, sum)| (category.clone(), sum.to_f64().unwrap_or_default()))
            .unzip();
        ChartData {
            labels,
            values,
            has_data: !totals.is_empty(),
        }
    }
}
