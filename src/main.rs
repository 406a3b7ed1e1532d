//! Drop Backend
//!
//! REST backend for a daily journaling app with SQLite persistence.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod journal;
mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use journal::{Clock, SystemClock};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(config.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.log_json).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Starting Drop Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.service_psk.is_none() {
        tracing::warn!("No service PSK configured (DROP_SERVICE_PSK). Sign-in and analyses are disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let questions = repo.list_questions().await?;
    tracing::info!("Question pool holds {} questions", questions.len());

    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
        clock: Arc::new(SystemClock),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the service auth layer
    let psk = state.config.service_psk.clone();

    // User routes, authenticated by session token
    let api_routes = Router::new()
        .route("/me", get(api::get_me))
        .route("/auth/session", delete(api::logout))
        // Questions
        .route("/questions", get(api::list_questions))
        .route("/questions/today", get(api::get_todays_question))
        // Drops
        .route("/drops", get(api::list_drops).post(api::create_drop))
        .route("/drops/recent", get(api::recent_drops))
        .route("/drops/latest", get(api::latest_drop))
        .route("/drops/{id}", get(api::get_drop))
        // Analyses
        .route("/analyses", get(api::list_analyses))
        .route("/analyses/{id}", get(api::get_analysis))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_auth_layer,
        ));

    // Identity provider and analyzer routes, authenticated by PSK
    let service_routes = Router::new()
        .route("/sessions", post(api::create_session))
        .route("/questions", post(api::create_question))
        .route("/analyses", post(api::create_analysis))
        .route("/users/{id}", delete(api::delete_user))
        .layer(middleware::from_fn(move |req, next| {
            auth::service_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .nest("/service", service_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
