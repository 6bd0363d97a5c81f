//! Campo Vision - Main Application Entry Point
//!
//! This is a REST API server for tracking telemetry from agricultural equipment. IoT devices report GPS position, temperature, and other sensor readings; the service stores them and serves them back to map and chart clients, scoped per tenant company.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: Bearer tokens issued by an external identity provider; the claims are decoded and trusted, the expiry is checked
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;

use tracing_subscriber::EnvFilter;

use axum::{
    Router,
    extract::FromRef,
    middleware as axum_middleware,
    routing::{get, post},
};
use db::DbPool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Shared application state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database connection pool
    pub pool: DbPool,

    /// Optional retention window applied to ingested readings
    pub telemetry_ttl_seconds: Option<i64>,
}

/// Lets handlers that only touch the database extract `State<DbPool>`.
impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> DbPool {
        state.pool.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let state = AppState {
        pool,
        telemetry_ttl_seconds: config.telemetry_ttl_seconds,
    };

    // Create authenticated routes (API endpoints)
    let authenticated_routes = Router::new()
        // Telemetry ingest and query
        .route(
            "/telemetry",
            post(handlers::telemetry::ingest_telemetry).get(handlers::telemetry::get_telemetry),
        )
        // Device management
        .route(
            "/devices",
            get(handlers::devices::list_devices)
                .post(handlers::devices::register_device)
                .put(handlers::devices::update_device)
                .delete(handlers::devices::delete_device),
        )
        .route("/device", get(handlers::devices::get_device))
        // Company management
        .route(
            "/company",
            get(handlers::companies::get_company)
                .post(handlers::companies::create_company)
                .put(handlers::companies::update_company)
                .delete(handlers::companies::delete_company),
        )
        // User-company associations
        .route(
            "/user-company",
            get(handlers::user_companies::get_associations)
                .post(handlers::user_companies::assign_user)
                .delete(handlers::user_companies::remove_user),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn(middleware::auth::auth_middleware));

    // Browser map/chart clients call the API cross-origin; preflight requests
    // are answered by this layer and never reach the auth middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Combine authenticated routes with public routes
    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        // Merge authenticated routes
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Share state with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
