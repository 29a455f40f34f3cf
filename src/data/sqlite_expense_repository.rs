use crate::domain::expense::{Amount, Expense};
use crate::domain::repository::ExpenseRepository;
use crate::infrastructure::database::Database;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, Row, params};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

const SELECT_EXPENSE: &str =
    "SELECT id, owner_id, category, amount, comment, created_at, updated_at FROM expenses";

#[derive(Clone)]
pub struct SqliteExpenseRepository {
    db: Database,
}

impl SqliteExpenseRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("corrupt timestamp {raw:?}"))?
        .with_timezone(&Utc))
}

struct ExpenseRow {
    id: String,
    owner_id: String,
    category: String,
    amount: String,
    comment: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ExpenseRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            category: row.get(2)?,
            amount: row.get(3)?,
            comment: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = anyhow::Error;

    fn try_from(row: ExpenseRow) -> Result<Self> {
        let amount = Decimal::from_str(&row.amount)
            .with_context(|| format!("corrupt amount {:?}", row.amount))?;
        Ok(Expense {
            id: Uuid::parse_str(&row.id).with_context(|| format!("corrupt expense id {:?}", row.id))?,
            owner_id: Uuid::parse_str(&row.owner_id)
                .with_context(|| format!("corrupt owner id {:?}", row.owner_id))?,
            category: row.category,
            amount: Amount::new(amount)?,
            comment: row.comment,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl ExpenseRepository for SqliteExpenseRepository {
    #[instrument(skip(self, expense), fields(expense_id = %expense.id, owner_id = %expense.owner_id))]
    async fn insert(&self, expense: Expense) -> Result<()> {
        self.db
            .run(move |conn| {
                conn.execute(
                    "INSERT INTO expenses
                         (id, owner_id, category, amount, comment, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        expense.id.to_string(),
                        expense.owner_id.to_string(),
                        expense.category,
                        expense.amount.inner().to_string(),
                        expense.comment,
                        timestamp(expense.created_at),
                        timestamp(expense.updated_at),
                    ],
                )
                .context("failed to insert expense")?;
                debug!(seq = conn.last_insert_rowid(), "Expense inserted");
                Ok(())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>> {
        self.db
            .run(move |conn| {
                conn.query_row(
                    &format!("{SELECT_EXPENSE} WHERE id = ?1"),
                    params![id.to_string()],
                    ExpenseRow::read,
                )
                .optional()?
                .map(Expense::try_from)
                .transpose()
            })
            .await
    }

    #[instrument(skip(self))]
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Expense>> {
        self.db
            .run(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_EXPENSE} WHERE owner_id = ?1 ORDER BY created_at DESC, seq DESC"
                ))?;
                let rows = stmt
                    .query_map(params![owner_id.to_string()], ExpenseRow::read)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                trace!(count = rows.len(), "Expenses listed for owner");
                rows.into_iter().map(Expense::try_from).collect()
            })
            .await
    }

    #[instrument(skip(self, expense), fields(expense_id = %expense.id))]
    async fn update(&self, expense: Expense) -> Result<bool> {
        self.db
            .run(move |conn| {
                let changed = conn
                    .execute(
                        "UPDATE expenses
                         SET category = ?1, amount = ?2, comment = ?3, updated_at = ?4
                         WHERE id = ?5",
                        params![
                            expense.category,
                            expense.amount.inner().to_string(),
                            expense.comment,
                            timestamp(expense.updated_at),
                            expense.id.to_string(),
                        ],
                    )
                    .context("failed to update expense")?;
                Ok(changed > 0)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.db
            .run(move |conn| {
                let removed = conn
                    .execute("DELETE FROM expenses WHERE id = ?1", params![id.to_string()])
                    .context("failed to delete expense")?;
                Ok(removed > 0)
            })
            .await
    }
}
