use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};
use expense_tracker::infrastructure::config::AppConfig;
use expense_tracker::infrastructure::database::Database;
use expense_tracker::infrastructure::logging::init_logging;
use expense_tracker::presentation::handlers::AppState;
use expense_tracker::presentation::middleware::{JwtAuthMiddleware, RequestTracingMiddleware};
use expense_tracker::presentation::routes::{self, ROUTES};
use tracing::info;

fn cors(allowed_origin: Option<&str>) -> Cors {
    match allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(3600),
        None => Cors::permissive(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_logging(config.json_logs);
    info!(host = %config.host, port = config.port, "Configuration loaded");

    let db = Database::open(&config.database_path)?;
    let state = web::Data::new(AppState::sqlite(
        db,
        config.jwt_secret.clone(),
        config.token_ttl_secs,
    ));
    info!("Application state initialized");

    let jwt_secret = config.jwt_secret.clone();
    let allowed_origin = config.cors_allowed_origin.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(JwtAuthMiddleware::new(jwt_secret.clone()))
            .wrap(cors(allowed_origin.as_deref()))
            .wrap(RequestTracingMiddleware)
            .configure(routes::configure)
    })
    .bind(config.bind_addr())?;

    info!(host = %config.host, port = config.port, routes = %ROUTES, "Starting HTTP server");
    server.run().await?;
    Ok(())
}
