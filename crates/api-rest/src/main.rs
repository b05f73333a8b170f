//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the HemoLink REST API on its own.
//!
//! ## Intended use
//! Useful for front-end development when only the HTTP API (with OpenAPI/Swagger UI) is
//! needed. The workspace's main `hemolink-run` binary also runs the breach-alert watcher.

use api_rest::{build_engine, router, AppState};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the HemoLink REST API server
///
/// # Environment Variables
/// - `HEMOLINK_REST_ADDR`: Server address (default: "0.0.0.0:8001")
/// - `HEMOLINK_SEED_FILE`: YAML seed data (default: built-in demo data)
/// - `HEMOLINK_PRIVACY_KEY`, `HEMOLINK_HOME_FACILITY`, `HEMOLINK_*_THRESHOLD`,
///   `HEMOLINK_SHELF_LIFE_DAYS`, `HEMOLINK_DONATION_INTERVAL_MONTHS`: engine settings
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration or seed data is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("hemolink_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("HEMOLINK_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8001".into());
    let seed_file = std::env::var("HEMOLINK_SEED_FILE").ok().map(PathBuf::from);

    let engine = build_engine(seed_file.as_deref())?;
    let app = router(AppState::new(engine));

    tracing::info!("-- Starting HemoLink REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
