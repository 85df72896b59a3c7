//! Ledger Balance Service - Main Application Entry Point
//!
//! A REST API over a personal-finance ledger (accounts and their
//! transactions). All durable state lives in a remote PostgREST store; this
//! service keeps each account's running balance consistent as transactions
//! are created, replaced and deleted.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Store**: Supabase/PostgREST over HTTP (reqwest)
//! - **Authentication**: Bearer token verified by the store's auth endpoint
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create the store client
//! 3. Build HTTP router with routes and middleware
//! 4. Start server on configured port

mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;
mod store;

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let client = store::rest::RestClient::new(
        &config.supabase_url,
        &config.supabase_key,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    tracing::info!(url = %config.supabase_url, "Store client created");

    let state = state::AppState::new(client, config.balance_retry_limit);

    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router: public health check plus authenticated ledger routes.
fn router(state: state::AppState) -> Router {
    let authenticated_routes = Router::new()
        .route(
            "/api/transactions",
            get(handlers::transactions::list_transactions)
                .post(handlers::transactions::create_transaction),
        )
        .route(
            "/api/transactions/{id}",
            put(handlers::transactions::update_transaction)
                .delete(handlers::transactions::delete_transaction),
        )
        .route("/api/accounts/{id}", get(handlers::accounts::get_account))
        .route(
            "/api/accounts/{id}/reconcile",
            post(handlers::accounts::reconcile_account),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/api/health", get(handlers::health::health_check))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
