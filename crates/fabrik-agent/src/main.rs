//! Fabrik Print Agent - Device-side print job orchestrator
//!
//! This is the main entry point for the print agent. It wires the printer
//! controller client, file stager and telemetry emitter into the
//! orchestrator, runs the progress reconciliation timer, and exposes the
//! inbound command channel.
//!
//! # HTTP Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /commands/:command` - Execute a remote command
//!   (`startPrint`, `cancelPrint`, `getStatus`)

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fabrik_agent::{dispatch, AgentConfig, PrintOrchestrator};
use fabrik_octoprint::OctoPrintClient;
use fabrik_staging::BlobStager;
use fabrik_telemetry::{fields_from, EventKind, HttpTelemetrySink, TelemetryHandle};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    orchestrator: Arc<PrintOrchestrator>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "fabrik-agent",
    })
}

/// Execute a remote command.
///
/// POST /commands/:command
async fn command_handler(
    State(state): State<AppState>,
    Path(command): Path<String>,
    payload: Option<Json<Value>>,
) -> impl IntoResponse {
    let payload = payload.map_or_else(|| json!({}), |Json(value)| value);
    let response = dispatch(&state.orchestrator, &command, &payload).await;
    (
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response.body),
    )
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/commands/:command", post(command_handler))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fabrik=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting fabrik print agent");

    // Load configuration from environment
    let config = AgentConfig::from_env()?;
    tracing::info!(
        device_id = %config.device_id,
        octoprint_url = %config.octoprint_url,
        storage_base_url = %config.storage_base_url,
        staging_dir = %config.staging_dir.display(),
        "Loaded agent configuration"
    );

    // Wire the collaborators
    let printer = Arc::new(OctoPrintClient::new(
        config.octoprint_url.clone(),
        config.octoprint_api_key.clone(),
    ));
    let stager = Arc::new(BlobStager::new(
        config.storage_base_url.clone(),
        config.staging_dir.clone(),
    ));
    let sink = Arc::new(HttpTelemetrySink::new(config.telemetry_url.clone()));
    let telemetry = TelemetryHandle::new(sink, config.device_id.clone());

    let orchestrator = Arc::new(PrintOrchestrator::with_progress_interval(
        printer,
        stager,
        telemetry.clone(),
        config.progress_interval,
    ));

    telemetry
        .emit(
            EventKind::AgentStarted,
            fields_from(json!({ "version": env!("CARGO_PKG_VERSION") })),
        )
        .await;

    // Start the reconciliation timer as a background task. The first tick is
    // deferred a full period; a just-started agent has nothing to reconcile.
    let reconcile_orchestrator = Arc::clone(&orchestrator);
    let poll_interval = config.poll_interval;
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + poll_interval;
        let mut ticker = tokio::time::interval_at(start, poll_interval);
        loop {
            ticker.tick().await;
            reconcile_orchestrator.reconcile_progress().await;
        }
    });
    tracing::info!(
        poll_interval_secs = poll_interval.as_secs(),
        "Started progress reconciliation loop"
    );

    // Create router and start the command channel
    let state = AppState { orchestrator };
    let app = create_router(state);

    tracing::info!(listen_addr = %config.listen_addr, "Starting command channel");
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    match served {
        Ok(()) => {
            telemetry
                .emit(EventKind::AgentStopped, serde_json::Map::new())
                .await;
            tracing::info!("Agent stopped");
            Ok(())
        }
        Err(e) => {
            telemetry
                .emit(EventKind::AgentError, agent_error_fields(&e))
                .await;
            tracing::error!(error = %e, "Agent exited with error");
            Err(e.into())
        }
    }
}

/// Payload for an `agent_error` event.
fn agent_error_fields(error: &impl std::fmt::Display) -> serde_json::Map<String, Value> {
    fields_from(json!({ "error": error.to_string() }))
}
