use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,
    #[error("Amount must not exceed {max}")]
    AmountTooLarge { max: i64 },
    #[error("Category must not be empty")]
    EmptyCategory,
    #[error("Username must not be empty")]
    EmptyUsername,
    #[error("Password must be at least {min_length} characters long")]
    WeakPassword { min_length: usize },
    #[error("Username is already taken")]
    DuplicateUsername,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Internal error: {0}")]
    Internal(String),
}
