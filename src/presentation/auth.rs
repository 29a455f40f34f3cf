use crate::domain::user::{CreateUser, LoginRequest};
use crate::presentation::handlers::{ApiError, AppState, UserResponse};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use tracing::{error, info, instrument};

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

// Request bodies carry passwords, so they stay out of the spans.
#[instrument(skip(state, req), fields(username = %req.username))]
pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<CreateUser>,
) -> Result<HttpResponse, ApiError> {
    info!("Registration request received");

    let user = state
        .auth_service
        .register(req.into_inner())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to register user");
            ApiError::from(e)
        })?;

    info!(user_id = %user.id, "User registered successfully");
    Ok(HttpResponse::Created().json(UserResponse {
        id: user.id,
        username: user.username,
    }))
}

#[instrument(skip(state, req), fields(username = %req.username))]
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    let token = state.auth_service.login(req.into_inner()).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: token,
        token_type: "Bearer",
    }))
}
