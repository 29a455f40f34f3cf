use crate::application::auth_service::AuthService;
use crate::application::authorization::{Action, AuthorizationGate};
use crate::application::expense_service::ExpenseService;
use crate::application::report_service::ReportService;
use crate::data::expense_repository::InMemoryExpenseRepository;
use crate::data::sqlite_expense_repository::SqliteExpenseRepository;
use crate::data::sqlite_user_repository::SqliteUserRepository;
use crate::data::user_repository::InMemoryUserRepository;
use crate::domain::error::DomainError;
use crate::domain::expense::{ExpenseChanges, NewExpense};
use crate::domain::report::ChartData;
use crate::domain::repository::{ExpenseRepository, UserRepository};
use crate::infrastructure::database::Database;
use crate::presentation::middleware::AuthenticatedUser;
use actix_web::{FromRequest, HttpMessage, HttpResponse, ResponseError, web};
use chrono::Utc;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// Body used for both "missing" and "someone else's" expenses.
const EXPENSE_UNAVAILABLE: &str = "Expense not found";

pub struct AppState {
    pub auth_service: Arc<AuthService<dyn UserRepository>>,
    pub expenses: ExpenseService<dyn ExpenseRepository, dyn UserRepository>,
    pub gate: AuthorizationGate<dyn ExpenseRepository>,
    pub reports: ReportService<dyn ExpenseRepository>,
}

impl AppState {
    /// Wires every service over one shared pair of repositories.
    pub fn new(
        users: Arc<dyn UserRepository>,
        expenses: Arc<dyn ExpenseRepository>,
        jwt_secret: String,
        token_ttl_secs: i64,
    ) -> Self {
        Self {
            auth_service: Arc::new(
                AuthService::new(users.clone(), jwt_secret).with_token_ttl(token_ttl_secs),
            ),
            expenses: ExpenseService::new(expenses.clone(), users),
            gate: AuthorizationGate::new(expenses.clone()),
            reports: ReportService::new(expenses),
        }
    }

    pub fn in_memory(jwt_secret: String, token_ttl_secs: i64) -> Self {
        Self::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryExpenseRepository::new()),
            jwt_secret,
            token_ttl_secs,
        )
    }

    /// Users and expenses persisted in one SQLite database.
    pub fn sqlite(db: Database, jwt_secret: String, token_ttl_secs: i64) -> Self {
        Self::new(
            Arc::new(SqliteUserRepository::new(db.clone())),
            Arc::new(SqliteExpenseRepository::new(db)),
            jwt_secret,
            token_ttl_secs,
        )
    }
}

// Uniform error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: serde_json::Value,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn message(&self) -> &str {
        match self {
            ApiError::Validation(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match self {
            ApiError::Validation(_) => actix_web::http::StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => actix_web::http::StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => actix_web::http::StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        match self {
            ApiError::Validation(_) => warn!(error = %error_msg, status = %status, "Validation error"),
            ApiError::NotFound(_) => warn!(error = %error_msg, status = %status, "Resource not found"),
            ApiError::Unauthorized(_) => warn!(error = %error_msg, status = %status, "Unauthorized"),
            ApiError::Internal(_) => error!(error = %error_msg, status = %status, "Internal error"),
        }

        HttpResponse::build(status).json(ErrorResponse {
            details: serde_json::json!({ "message": self.message() }),
            error: error_msg,
        })
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::Validation(v)) => ApiError::Validation(v.to_string()),
            Some(DomainError::NotFound(msg)) => ApiError::NotFound(msg.clone()),
            // Same response as a missing expense so other users' ids don't leak.
            Some(DomainError::Forbidden(_)) => ApiError::NotFound(EXPENSE_UNAVAILABLE.to_string()),
            Some(DomainError::InvalidCredentials) => {
                ApiError::Unauthorized("Invalid username or password".to_string())
            }
            Some(DomainError::Internal(msg)) => ApiError::Internal(msg.clone()),
            None => ApiError::Internal(err.to_string()),
        }
    }
}

/// Requires a valid bearer token whose subject is still a registered user.
impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let user = req.extensions().get::<AuthenticatedUser>().copied();
        let state = req.app_data::<web::Data<AppState>>().cloned();
        Box::pin(async move {
            let user = user.ok_or_else(|| {
                ApiError::Unauthorized("missing or invalid bearer token".to_string())
            })?;
            let state = state
                .ok_or_else(|| ApiError::Internal("application state not configured".to_string()))?;

            match state.auth_service.find_user(user.user_id).await {
                Ok(_) => Ok(user),
                Err(err) => match err.downcast_ref::<DomainError>() {
                    Some(DomainError::NotFound(_)) => {
                        warn!(user_id = %user.user_id, "Token subject no longer exists");
                        Err(ApiError::Unauthorized("unknown token subject".to_string()))
                    }
                    _ => Err(ApiError::from(err)),
                },
            }
        })
    }
}

/// Rejections from the JSON extractor become the uniform 400 body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::Validation(err.to_string()).into())
}

/// Path segments that are not valid ids get the same 404 as a missing expense.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|_err, _req| ApiError::NotFound(EXPENSE_UNAVAILABLE.to_string()).into())
}

fn collapse_denied(err: anyhow::Error) -> ApiError {
    match err.downcast_ref::<DomainError>() {
        Some(DomainError::NotFound(_)) | Some(DomainError::Forbidden(_)) => {
            ApiError::NotFound(EXPENSE_UNAVAILABLE.to_string())
        }
        _ => ApiError::from(err),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
}

#[instrument]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let user = state.auth_service.find_user(user.user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.id,
        username: user.username,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_expenses(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let expenses = state.expenses.list_by_owner(user.user_id).await?;
    info!(count = expenses.len(), "Expenses listed");
    Ok(HttpResponse::Ok().json(expenses))
}

#[instrument(skip(state, user, req), fields(user_id = %user.user_id, expense_id))]
pub async fn create_expense(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<NewExpense>,
) -> Result<HttpResponse, ApiError> {
    let expense = state
        .expenses
        .create(user.user_id, req.into_inner())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create expense");
            e
        })?;
    tracing::Span::current().record("expense_id", tracing::field::display(expense.id));
    Ok(HttpResponse::Created().json(expense))
}

#[instrument(skip(state, user), fields(user_id = %user.user_id, expense_id = %*path))]
pub async fn get_expense(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let expense_id = path.into_inner();
    state
        .gate
        .require(user.user_id, expense_id, Action::Read)
        .await
        .map_err(collapse_denied)?;
    let expense = state.expenses.get(expense_id).await.map_err(collapse_denied)?;
    Ok(HttpResponse::Ok().json(expense))
}

#[instrument(skip(state, user, req), fields(user_id = %user.user_id, expense_id = %*path))]
pub async fn update_expense(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    req: web::Json<ExpenseChanges>,
) -> Result<HttpResponse, ApiError> {
    let expense_id = path.into_inner();
    state
        .gate
        .require(user.user_id, expense_id, Action::Edit)
        .await
        .map_err(collapse_denied)?;
    let expense = state
        .expenses
        .update(expense_id, req.into_inner())
        .await
        .map_err(collapse_denied)?;
    info!(expense_id = %expense.id, "Expense updated");
    Ok(HttpResponse::Ok().json(expense))
}

#[instrument(skip(state, user), fields(user_id = %user.user_id, expense_id = %*path))]
pub async fn delete_expense(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let expense_id = path.into_inner();
    state
        .gate
        .require(user.user_id, expense_id, Action::Delete)
        .await
        .map_err(collapse_denied)?;
    state
        .expenses
        .delete(expense_id)
        .await
        .map_err(collapse_denied)?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn chart_data(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let totals = state.reports.aggregate_by_category(user.user_id).await?;
    let chart = ChartData::from(&totals);
    info!(categories = chart.labels.len(), has_data = chart.has_data, "Chart data built");
    Ok(HttpResponse::Ok().json(chart))
}
