use crate::domain::error::DomainError;
use crate::domain::report::CategoryTotals;
use crate::domain::repository::ExpenseRepository;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use uuid::Uuid;

pub struct ReportService<R: ExpenseRepository + ?Sized> {
    expenses: Arc<R>,
}

impl<R: ExpenseRepository + ?Sized> ReportService<R> {
    pub fn new(expenses: Arc<R>) -> Self {
        Self { expenses }
    }

    /// Sums the owner's expenses per category. An owner with no expenses gets
    /// empty totals.
    #[instrument(skip(self))]
    pub async fn aggregate_by_category(&self, owner_id: Uuid) -> Result<CategoryTotals> {
        let expenses = self.expenses.find_by_owner(owner_id).await?;

        let mut totals = CategoryTotals::new();
        for expense in &expenses {
            totals
                .add(&expense.category, expense.amount.inner())
                .map_err(|e| {
                    error!(error = %e, "Category total overflowed");
                    DomainError::Internal(e.to_string())
                })?;
        }

        debug!(
            expenses = expenses.len(),
            categories = totals.len(),
            "Aggregated expenses by category"
        );
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::expense_repository::InMemoryExpenseRepository;
    use crate::domain::expense::{Amount, Expense, MAX_AMOUNT};
    use chrono::Utc;
    use rust_decimal::Decimal;

    async fn seed(repo: &InMemoryExpenseRepository, owner_id: Uuid, category: &str, amount: i64) {
        let now = Utc::now();
        repo.insert(Expense {
            id: Uuid::new_v4(),
            owner_id,
            category: category.to_string(),
            amount: Amount::new(Decimal::from(amount)).unwrap(),
            comment: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_sums_per_category() {
        let repo = InMemoryExpenseRepository::new();
        let owner = Uuid::new_v4();
        seed(&repo, owner, "food", 10).await;
        seed(&repo, owner, "food", 5).await;
        seed(&repo, owner, "travel", 20).await;

        let reports = ReportService::new(Arc::new(repo));
        let totals = reports.aggregate_by_category(owner).await.unwrap();

        assert_eq!(totals.len(), 2);
        assert_eq!(totals.get("food"), Some(Decimal::new(15, 0)));
        assert_eq!(totals.get("travel"), Some(Decimal::new(20, 0)));
    }

    #[tokio::test]
    async fn test_only_counts_owner_expenses() {
        let repo = InMemoryExpenseRepository::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        seed(&repo, owner, "food", 10).await;
        seed(&repo, other, "food", 99).await;
        seed(&repo, other, "rent", 500).await;

        let reports = ReportService::new(Arc::new(repo));
        let totals = reports.aggregate_by_category(owner).await.unwrap();

        assert_eq!(totals.len(), 1);
        assert_eq!(totals.get("food"), Some(Decimal::new(10, 0)));
        assert_eq!(totals.get("rent"), None);
    }

    #[tokio::test]
    async fn test_categories_are_case_sensitive() {
        let repo = InMemoryExpenseRepository::new();
        let owner = Uuid::new_v4();
        seed(&repo, owner, "Food", 1).await;
        seed(&repo, owner, "food", 2).await;

        let reports = ReportService::new(Arc::new(repo));
        let totals = reports.aggregate_by_category(owner).await.unwrap();

        assert_eq!(totals.get("Food"), Some(Decimal::new(1, 0)));
        assert_eq!(totals.get("food"), Some(Decimal::new(2, 0)));
    }

    #[tokio::test]
    async fn test_no_expenses_yields_empty_totals() {
        let reports = ReportService::new(Arc::new(InMemoryExpenseRepository::new()));

        let totals = reports.aggregate_by_category(Uuid::new_v4()).await.unwrap();
        assert!(totals.is_empty());
    }

    #[tokio::test]
    async fn test_largest_amounts_sum_without_overflow() {
        let repo = InMemoryExpenseRepository::new();
        let owner = Uuid::new_v4();
        for _ in 0..3 {
            seed(&repo, owner, "yacht", MAX_AMOUNT).await;
        }

        let reports = ReportService::new(Arc::new(repo));
        let totals = reports.aggregate_by_category(owner).await.unwrap();

        assert_eq!(totals.get("yacht"), Some(Decimal::from(MAX_AMOUNT) * Decimal::from(3)));
    }
}
