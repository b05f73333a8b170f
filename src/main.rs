use hemolink_core::InventoryEvent;
use std::path::PathBuf;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{build_engine, router, AppState};

/// Main entry point for the HemoLink application
///
/// Starts the REST server and a breach-alert watcher that logs every breach and low-stock
/// event the engine publishes. Stops on Ctrl-C.
///
/// # Environment Variables
/// - `HEMOLINK_REST_ADDR`: REST server address (default: "0.0.0.0:8001")
/// - `HEMOLINK_SEED_FILE`: YAML seed data (default: built-in demo data)
/// - `HEMOLINK_PRIVACY_KEY`: key that unlocks per-type hospital stock
/// - `HEMOLINK_HOME_FACILITY`: default transfer destination (default: "CBB")
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hemolink_run=info".parse()?)
                .add_directive("hemolink_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("HEMOLINK_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8001".into());
    let seed_file = std::env::var("HEMOLINK_SEED_FILE").ok().map(PathBuf::from);

    let engine = build_engine(seed_file.as_deref())?;
    let watcher = tokio::spawn(watch_alerts(engine.subscribe()));
    let app = router(AppState::new(engine));

    tracing::info!("++ Starting HemoLink REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {:?}", e);
            }
            tracing::info!("-- Shutting down");
        })
        .await?;

    watcher.abort();
    Ok(())
}

/// Logs breach and low-stock alerts until the engine's event channel closes.
async fn watch_alerts(mut rx: broadcast::Receiver<InventoryEvent>) {
    loop {
        match rx.recv().await {
            Ok(InventoryEvent::UnitBreached {
                unit_id,
                blood_type,
                temperature,
                location,
            }) => {
                tracing::warn!(
                    unit_id,
                    %blood_type,
                    temperature,
                    location,
                    "COLD-CHAIN BREACH: unit locked"
                );
            }
            Ok(InventoryEvent::LowStock {
                hospital_id,
                level,
                total_units,
            }) => {
                tracing::warn!(hospital_id, %level, total_units, "hospital stock is {}", level);
            }
            Ok(InventoryEvent::TransferSubmitted { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "alert watcher fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
