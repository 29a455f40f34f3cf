use crate::presentation::auth::{login, register};
use crate::presentation::handlers::{
    chart_data, create_expense, delete_expense, get_expense, health_check, json_config,
    list_expenses, me, path_config, update_expense,
};
use actix_web::web;

pub const ROUTES: &str = "GET /api/health, POST /api/auth/register, POST /api/auth/login, \
    GET /api/me, GET|POST /api/expenses, GET|PUT|DELETE /api/expenses/{id}, GET /api/chart_data";

/// Mounts the whole API under `/api`. Protected handlers take an
/// `AuthenticatedUser`, so the app must also be wrapped in `JwtAuthMiddleware`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .service(
            web::scope("/api")
                .route("/health", web::get().to(health_check))
                .route("/auth/register", web::post().to(register))
                .route("/auth/login", web::post().to(login))
                .route("/me", web::get().to(me))
                .route("/expenses", web::get().to(list_expenses))
                .route("/expenses", web::post().to(create_expense))
                .route("/expenses/{id}", web::get().to(get_expense))
                .route("/expenses/{id}", web::put().to(update_expense))
                .route("/expenses/{id}", web::delete().to(delete_expense))
                .route("/chart_data", web::get().to(chart_data)),
        );
}
