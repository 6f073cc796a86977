//! grabbi-server: multi-franchise grocery backend
//!
//! Long-running service that:
//! - Serves the customer catalog, cart, checkout and loyalty APIs
//! - Lets franchise owners and staff manage stock, prices and hours
//! - Runs admin batch imports in the background with pollable jobs
//! - Sends transactional email from a bounded queue

mod api;
mod auth;
mod catalog;
mod config;
mod db;
mod email;
mod error;
mod import;
mod media;
mod orders;
mod state;
mod util;

use std::net::SocketAddr;

use config::Config;
use error::BoxError;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grabbi_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting grabbi-server v{}", env!("CARGO_PKG_VERSION"));

    let pool = db::connect(&config.database_url).await?;
    db::migrate(&pool).await?;
    tracing::info!("Database migrations applied");

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        auth::account::seed_admin(&pool, email, password).await?;
    }

    let (state, mail_worker) = AppState::new(&config, pool)?;
    state.spawn_background(mail_worker);

    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("grabbi-server HTTP listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("grabbi-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
