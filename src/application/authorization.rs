use crate::domain::error::DomainError;
use crate::domain::repository::ExpenseRepository;
use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Edit,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Read => write!(f, "read"),
            Action::Edit => write!(f, "edit"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotFound,
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// Decides whether a user may act on an expense. Ownership is the only rule:
/// the owner may do anything, everyone else nothing.
pub struct AuthorizationGate<R: ExpenseRepository + ?Sized> {
    expenses: Arc<R>,
}

impl<R: ExpenseRepository + ?Sized> AuthorizationGate<R> {
    pub fn new(expenses: Arc<R>) -> Self {
        Self { expenses }
    }

    #[instrument(skip(self))]
    pub async fn authorize(
        &self,
        user_id: Uuid,
        expense_id: Uuid,
        action: Action,
    ) -> Result<Decision> {
        let decision = match self.expenses.find_by_id(expense_id).await? {
            None => Decision::Deny(DenyReason::NotFound),
            Some(expense) if expense.owner_id != user_id => Decision::Deny(DenyReason::Forbidden),
            Some(_) => Decision::Allow,
        };

        match decision {
            Decision::Allow => debug!(%action, "Access allowed"),
            Decision::Deny(reason) => warn!(%action, ?reason, "Access denied"),
        }
        Ok(decision)
    }

    /// `authorize`, with a deny turned into the matching `DomainError`.
    pub async fn require(&self, user_id: Uuid, expense_id: Uuid, action: Action) -> Result<()> {
        match self.authorize(user_id, expense_id, action).await? {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::NotFound) => {
                Err(DomainError::NotFound(format!("Expense not found: {}", expense_id)).into())
            }
            Decision::Deny(DenyReason::Forbidden) => Err(DomainError::Forbidden(format!(
                "User {} may not {} expense {}",
                user_id, action, expense_id
            ))
            .into()),
        }
    }
}
