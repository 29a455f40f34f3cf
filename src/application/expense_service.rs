use crate::domain::error::DomainError;
use crate::domain::expense::{
    Amount, Expense, ExpenseChanges, NewExpense, normalize_category, normalize_comment,
};
use crate::domain::repository::{ExpenseRepository, UserRepository};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// CRUD over expenses. Access control is the caller's job: every mutation
/// must be preceded by a successful `AuthorizationGate::require`.
pub struct ExpenseService<E: ExpenseRepository + ?Sized, U: UserRepository + ?Sized> {
    expenses: Arc<E>,
    users: Arc<U>,
}

impl<E, U> ExpenseService<E, U>
where
    E: ExpenseRepository + ?Sized,
    U: UserRepository + ?Sized,
{
    pub fn new(expenses: Arc<E>, users: Arc<U>) -> Self {
        Self { expenses, users }
    }

    #[instrument(skip(self, req), fields(category = %req.category))]
    pub async fn create(&self, owner_id: Uuid, req: NewExpense) -> Result<Expense> {
        let category = normalize_category(&req.category).map_err(DomainError::from)?;
        let amount = Amount::new(req.amount).map_err(DomainError::from)?;

        if self.users.find_user_by_id(owner_id).await?.is_none() {
            warn!(owner_id = %owner_id, "Expense owner does not exist");
            return Err(DomainError::NotFound(format!("User not found: {}", owner_id)).into());
        }

        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4(),
            owner_id,
            category,
            amount,
            comment: normalize_comment(req.comment),
            created_at: now,
            updated_at: now,
        };
        self.expenses.insert(expense.clone()).await?;

        info!(
            expense_id = %expense.id,
            owner_id = %owner_id,
            amount = %expense.amount.inner(),
            "Expense created"
        );
        Ok(expense)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, expense_id: Uuid) -> Result<Expense> {
        self.expenses
            .find_by_id(expense_id)
            .await?
            .ok_or_else(|| expense_not_found(expense_id))
    }

    #[instrument(skip(self))]
    pub async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Expense>> {
        let expenses = self.expenses.find_by_owner(owner_id).await?;
        debug!(count = expenses.len(), "Expenses listed");
        Ok(expenses)
    }

    #[instrument(skip(self, changes))]
    pub async fn update(&self, expense_id: Uuid, changes: ExpenseChanges) -> Result<Expense> {
        let mut expense = self.get(expense_id).await?;

        if let Some(category) = changes.category {
            expense.category = normalize_category(&category).map_err(DomainError::from)?;
        }
        if let Some(amount) = changes.amount {
            expense.amount = Amount::new(amount).map_err(DomainError::from)?;
        }
        if let Some(comment) = changes.comment {
            expense.comment = normalize_comment(Some(comment));
        }
        expense.updated_at = Utc::now();

        // Deleted between the read and the write.
        if !self.expenses.update(expense.clone()).await? {
            return Err(expense_not_found(expense_id));
        }

        info!(expense_id = %expense_id, "Expense updated");
        Ok(expense)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, expense_id: Uuid) -> Result<()> {
        if !self.expenses.delete(expense_id).await? {
            return Err(expense_not_found(expense_id));
        }
        info!(expense_id = %expense_id, "Expense deleted");
        Ok(())
    }
}

fn expense_not_found(expense_id: Uuid) -> anyhow::Error {
    DomainError::NotFound(format!("Expense not found: {}", expense_id)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::expense_repository::InMemoryExpenseRepository;
    use crate::data::user_repository::InMemoryUserRepository;
    use crate::domain::error::ValidationError;
    use crate::domain::user::User;
    use rust_decimal::Decimal;

    type Service = ExpenseService<InMemoryExpenseRepository, InMemoryUserRepository>;

    async fn setup() -> (Service, Uuid) {
        let users = InMemoryUserRepository::new();
        let owner = User {
            id: Uuid::new_v4(),
            username: "owner".to_string(),
            password_hash: "hash".to_string(),
        };
        users.save_user(owner.clone()).await.unwrap();
        let service = ExpenseService::new(
            Arc::new(InMemoryExpenseRepository::new()),
            Arc::new(users),
        );
        (service, owner.id)
    }

    fn new_expense(category: &str, amount: Decimal) -> NewExpense {
        NewExpense {
            category: category.to_string(),
            amount,
            comment: None,
        }
    }

    fn domain_error(err: &anyhow::Error) -> &DomainError {
        err.downcast_ref::<DomainError>().unwrap()
    }

    #[tokio::test]
    async fn test_create_rejects_zero_and_negative_amounts() {
        let (service, owner) = setup().await;

        for amount in [Decimal::ZERO, Decimal::new(-5, 0)] {
            let err = service
                .create(owner, new_expense("food", amount))
                .await
                .unwrap_err();
            assert!(matches!(
                domain_error(&err),
                DomainError::Validation(ValidationError::NonPositiveAmount)
            ));
        }
    }

    #[tokio::test]
    async fn test_create_accepts_one_cent() {
        let (service, owner) = setup().await;

        let expense = service
            .create(owner, new_expense("food", Decimal::new(1, 2)))
            .await
            .unwrap();
        assert_eq!(expense.amount.inner(), Decimal::new(1, 2));
        assert_eq!(expense.owner_id, owner);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_category() {
        let (service, owner) = setup().await;

        let err = service
            .create(owner, new_expense("  ", Decimal::ONE))
            .await
            .unwrap_err();
        assert!(matches!(
            domain_error(&err),
            DomainError::Validation(ValidationError::EmptyCategory)
        ));
    }

    #[tokio::test]
    async fn test_create_requires_existing_owner() {
        let (service, _) = setup().await;

        let err = service
            .create(Uuid::new_v4(), new_expense("food", Decimal::ONE))
            .await
            .unwrap_err();
        assert!(matches!(domain_error(&err), DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_by_owner_latest_first() {
        let (service, owner) = setup().await;

        let first = service
            .create(owner, new_expense("food", Decimal::ONE))
            .await
            .unwrap();
        let second = service
            .create(owner, new_expense("travel", Decimal::TWO))
            .await
            .unwrap();

        let listed = service.list_by_owner(owner).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_absent_fields() {
        let (service, owner) = setup().await;
        let created = service
            .create(
                owner,
                NewExpense {
                    category: "food".to_string(),
                    amount: Decimal::new(10, 0),
                    comment: Some("lunch".to_string()),
                },
            )
            .await
            .unwrap();

        let changes = ExpenseChanges {
            amount: Some(Decimal::new(12, 0)),
            ..Default::default()
        };
        service.update(created.id, changes).await.unwrap();

        let fetched = service.get(created.id).await.unwrap();
        assert_eq!(fetched.amount.inner(), Decimal::new(12, 0));
        assert_eq!(fetched.category, "food");
        assert_eq!(fetched.comment.as_deref(), Some("lunch"));
        assert_eq!(fetched.created_at, created.created_at);
        assert!(fetched.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_revalidates_amount() {
        let (service, owner) = setup().await;
        let created = service
            .create(owner, new_expense("food", Decimal::ONE))
            .await
            .unwrap();

        let changes = ExpenseChanges {
            amount: Some(Decimal::ZERO),
            ..Default::default()
        };
        let err = service.update(created.id, changes).await.unwrap_err();
        assert!(matches!(domain_error(&err), DomainError::Validation(_)));

        let unchanged = service.get(created.id).await.unwrap();
        assert_eq!(unchanged.amount.inner(), Decimal::ONE);
    }

    #[tokio::test]
    async fn test_update_empty_comment_clears_it() {
        let (service, owner) = setup().await;
        let created = service
            .create(
                owner,
                NewExpense {
                    category: "food".to_string(),
                    amount: Decimal::ONE,
                    comment: Some("note".to_string()),
                },
            )
            .await
            .unwrap();

        let changes = ExpenseChanges {
            comment: Some(String::new()),
            ..Default::default()
        };
        let updated = service.update(created.id, changes).await.unwrap();
        assert!(updated.comment.is_none());
    }

    #[tokio::test]
    async fn test_update_missing_expense() {
        let (service, _) = setup().await;

        let err = service
            .update(Uuid::new_v4(), ExpenseChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(domain_error(&err), DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_then_get_and_delete_again() {
        let (service, owner) = setup().await;
        let created = service
            .create(owner, new_expense("food", Decimal::ONE))
            .await
            .unwrap();

        service.delete(created.id).await.unwrap();

        let get_err = service.get(created.id).await.unwrap_err();
        assert!(matches!(domain_error(&get_err), DomainError::NotFound(_)));

        let delete_err = service.delete(created.id).await.unwrap_err();
        assert!(matches!(domain_error(&delete_err), DomainError::NotFound(_)));
    }
}
