use crate::domain::expense::Expense;
use crate::domain::repository::ExpenseRepository;
use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

struct Row {
    seq: u64,
    expense: Expense,
}

#[derive(Default)]
struct Table {
    next_seq: u64,
    rows: HashMap<Uuid, Row>,
}

#[derive(Clone)]
pub struct InMemoryExpenseRepository {
    storage: Arc<RwLock<Table>>,
}

impl InMemoryExpenseRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(Table::default())),
        }
    }
}

impl Default for InMemoryExpenseRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExpenseRepository for InMemoryExpenseRepository {
    #[instrument(skip(self, expense), fields(expense_id = %expense.id, owner_id = %expense.owner_id))]
    async fn insert(&self, expense: Expense) -> Result<()> {
        let mut table = self.storage.write().await;
        let seq = table.next_seq;
        table.next_seq += 1;
        table.rows.insert(expense.id, Row { seq, expense });
        debug!(seq, "Expense inserted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>> {
        let table = self.storage.read().await;
        Ok(table.rows.get(&id).map(|row| row.expense.clone()))
    }

    #[instrument(skip(self))]
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Expense>> {
        let table = self.storage.read().await;
        let mut rows: Vec<&Row> = table
            .rows
            .values()
            .filter(|row| row.expense.owner_id == owner_id)
            .collect();
        rows.sort_by_key(|row| Reverse((row.expense.created_at, row.seq)));
        trace!(count = rows.len(), "Expenses listed for owner");
        Ok(rows.into_iter().map(|row| row.expense.clone()).collect())
    }

    #[instrument(skip(self, expense), fields(expense_id = %expense.id))]
    async fn update(&self, expense: Expense) -> Result<bool> {
        let mut table = self.storage.write().await;
        match table.rows.get_mut(&expense.id) {
            Some(row) => {
                row.expense = expense;
                debug!("Expense updated");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut table = self.storage.write().await;
        let removed = table.rows.remove(&id).is_some();
        debug!(removed, "Expense delete processed");
        Ok(removed)
    }
}
