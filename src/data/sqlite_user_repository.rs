use crate::domain::error::{DomainError, ValidationError};
use crate::domain::repository::UserRepository;
use crate::domain::user::User;
use crate::infrastructure::database::Database;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct SqliteUserRepository {
    db: Database,
}

impl SqliteUserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

type UserRow = (String, String, String);

fn user_from_row((id, username, password_hash): UserRow) -> Result<User> {
    Ok(User {
        id: Uuid::parse_str(&id).with_context(|| format!("corrupt user id {id:?}"))?,
        username,
        password_hash,
    })
}

const SELECT_USER: &str = "SELECT id, username, password_hash FROM users";

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id, username = %user.username))]
    async fn save_user(&self, user: User) -> Result<()> {
        self.db
            .run(move |conn| {
                let saved = conn.execute(
                    "INSERT INTO users (id, username, password_hash) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET
                         username = excluded.username,
                         password_hash = excluded.password_hash",
                    params![user.id.to_string(), user.username, user.password_hash],
                );
                match saved {
                    Ok(_) => {
                        debug!("User saved to database");
                        Ok(())
                    }
                    // The UNIQUE index is the arbiter between concurrent signups.
                    Err(e) if is_unique_violation(&e) => {
                        warn!("Username already taken");
                        Err(DomainError::from(ValidationError::DuplicateUsername).into())
                    }
                    Err(e) => Err(anyhow::Error::from(e).context("failed to save user")),
                }
            })
            .await
    }

    #[instrument(skip(self))]
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_string();
        self.db
            .run(move |conn| {
                conn.query_row(
                    &format!("{SELECT_USER} WHERE username = ?1"),
                    params![username],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?
                .map(user_from_row)
                .transpose()
            })
            .await
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.db
            .run(move |conn| {
                conn.query_row(
                    &format!("{SELECT_USER} WHERE id = ?1"),
                    params![id.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?
                .map(user_from_row)
                .transpose()
            })
            .await
    }
}
