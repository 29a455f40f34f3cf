use crate::domain::error::{DomainError, ValidationError};
use crate::domain::repository::UserRepository;
use crate::domain::user::{CreateUser, LoginRequest, User};
use crate::infrastructure::security::{
    DEFAULT_TOKEN_TTL_SECS, generate_token, hash_password, verify_password,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct AuthService<R: UserRepository + ?Sized> {
    user_repository: Arc<R>,
    jwt_secret: String,
    token_ttl_secs: i64,
}

impl<R: UserRepository + ?Sized> AuthService<R> {
    pub fn new(user_repository: Arc<R>, jwt_secret: String) -> Self {
        Self {
            user_repository,
            jwt_secret,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    pub fn with_token_ttl(mut self, token_ttl_secs: i64) -> Self {
        self.token_ttl_secs = token_ttl_secs;
        self
    }

    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn register(&self, req: CreateUser) -> Result<User> {
        trace!("Starting user registration");

        let username = req.username.trim().to_string();
        if username.is_empty() {
            return Err(DomainError::from(ValidationError::EmptyUsername).into());
        }
        if req.password.chars().count() < MIN_PASSWORD_LENGTH {
            warn!("Rejected weak password");
            return Err(DomainError::from(ValidationError::WeakPassword {
                min_length: MIN_PASSWORD_LENGTH,
            })
            .into());
        }

        if self
            .user_repository
            .find_user_by_username(&username)
            .await?
            .is_some()
        {
            warn!("Username already taken");
            return Err(DomainError::from(ValidationError::DuplicateUsername).into());
        }

        let password_hash = hash_password(&req.password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            DomainError::Internal(format!("Failed to hash password: {}", e))
        })?;

        let user = User {
            id: Uuid::new_v4(),
            username,
            password_hash,
        };

        debug!(user_id = %user.id, "Saving user to repository");
        // The repository re-checks uniqueness atomically.
        self.user_repository.save_user(user.clone()).await?;

        info!(user_id = %user.id, username = %user.username, "User registered successfully");
        Ok(user)
    }

    /// Unknown usernames and wrong passwords both yield `InvalidCredentials`.
    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn verify(&self, req: LoginRequest) -> Result<User> {
        trace!("Verifying credentials");

        let user = self
            .user_repository
            .find_user_by_username(req.username.trim())
            .await?
            .ok_or_else(|| {
                warn!("Unknown username during login");
                DomainError::InvalidCredentials
            })?;

        let is_valid = verify_password(&req.password, &user.password_hash).map_err(|e| {
            error!(error = %e, "Failed to verify password");
            DomainError::Internal(format!("Failed to verify password: {}", e))
        })?;

        if !is_valid {
            warn!(user_id = %user.id, "Invalid password during login");
            return Err(DomainError::InvalidCredentials.into());
        }

        Ok(user)
    }

    /// Verifies credentials and issues a bearer token for the session.
    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn login(&self, req: LoginRequest) -> Result<String> {
        let user = self.verify(req).await?;

        let token = generate_token(user.id, &self.jwt_secret, self.token_ttl_secs).map_err(|e| {
            error!(error = %e, "Failed to generate token");
            DomainError::Internal(format!("Failed to generate token: {}", e))
        })?;

        info!(user_id = %user.id, "Login successful");
        Ok(token)
    }

    #[instrument(skip(self))]
    pub async fn find_user(&self, user_id: Uuid) -> Result<User> {
        self.user_repository
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User not found: {}", user_id)).into())
    }
}
