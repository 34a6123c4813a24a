//! Cropwatch - alert feed reconciliation for vertical farm monitoring.
//!
//! # API Endpoints
//!
//! - `GET /alerts` - Reconciled alerts, filterable by status and severity
//! - `POST /alerts/refresh` - Run a fetch cycle now
//! - `POST /alerts/:id/resolve` - Mark an alert resolved
//! - `GET /health` - Health check
//!
//! # Configuration
//!
//! See [`cropwatch::config`] for the `CROPWATCH_*` environment variables.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cropwatch::api::{AppState, router};
use cropwatch::config::Config;
use cropwatch::controller::FallbackController;
use cropwatch::data_sources::GeneratorClient;
use cropwatch::monitor::AlertMonitor;
use cropwatch::notify::LogNotifier;
use cropwatch::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("cropwatch=info".parse()?))
        .init();

    let config = Config::from_env();

    info!(
        port = config.port,
        db_url = %config.database_url,
        source_url = %config.source_url,
        poll_secs = config.poll_interval.as_secs(),
        "Starting Cropwatch"
    );

    if let Err(e) = config.context.validate() {
        // Keep serving: refresh reports the problem until the context is fixed.
        warn!(error = %e, "Farm context incomplete; alert cycles will be rejected");
    }

    // Initialize storage
    let storage = Storage::new(&config.database_url).await?;
    info!("Cache store initialized");

    let source = GeneratorClient::with_base_url(&config.source_url)
        .with_id_strategy(config.id_strategy);
    let controller = FallbackController::new(Arc::new(source), Arc::new(storage))
        .with_fetch_timeout(config.fetch_timeout);

    let monitor = AlertMonitor::new(
        controller,
        config.context.clone(),
        config.preferences,
        Arc::new(LogNotifier::new(config.notify_recipient.clone())),
    );
    let poller = monitor.spawn(config.poll_interval);

    let app = router(AppState {
        monitor: monitor.clone(),
    })
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Cropwatch is listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    monitor.shutdown();
    poller.await?;
    info!("Cropwatch stopped");

    Ok(())
}
