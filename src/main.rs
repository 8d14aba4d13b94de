//! reef-market — multi-retailer order-to-payout service
//!
//! Long-running service that:
//! - Materializes buyer carts into per-retailer order groups
//! - Applies discount codes and points redemption across groups
//! - Creates hosted checkout sessions with per-group commission
//! - Reconciles settlement state from signed processor webhooks
//! - Computes retailer balances and executes payouts

mod api;
mod auth;
mod checkout;
mod config;
mod db;
mod error;
mod money;
mod payout;
mod psp;
mod settlement;
mod state;
mod util;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reef_market=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting reef-market (env: {})", config.environment);

    // Initialize application state
    let state = AppState::new(&config).await?;

    let app = api::create_router(state.clone());

    // Periodic settlement reconciliation (lost-webhook recovery)
    let reconcile_state = state.clone();
    let reconcile_interval = config.reconcile_interval_secs;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(reconcile_interval));
        loop {
            interval.tick().await;
            settlement::reconcile::run_sweep(&reconcile_state).await;
        }
    });

    // Start HTTP server
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("reef-market HTTP listening on {http_addr}");

    axum::serve(http_listener, app).await?;

    Ok(())
}
