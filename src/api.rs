//! HTTP API handlers for Cropwatch.
//!
//! - **GET /alerts**: the reconciled alert list through a status/severity filter.
//! - **POST /alerts/refresh**: run a fetch cycle now.
//! - **POST /alerts/:id/resolve**: mark an alert resolved.
//! - **GET /health**: liveness.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::model::{AlertId, AlertsQuery, AlertsResponse, RefreshResponse, ResolveResponse};
use crate::monitor::AlertMonitor;
use crate::view::{AlertFilter, AlertSummary, filtered_view};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub monitor: AlertMonitor,
}

/// Build the router with all endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/alerts", get(get_alerts))
        .route("/alerts/refresh", post(refresh_alerts))
        .route("/alerts/:id/resolve", post(resolve_alert))
        .route("/health", get(health_check))
        .with_state(state)
}

/// GET /alerts - The current alert list.
///
/// # Query Parameters
///
/// - `status` (optional): `all`, `active` (default) or `resolved`
/// - `severity` (optional): `critical`, `warning`, `info` or the
///   `high`/`medium`/`low` synonyms
///
/// # Response
///
/// ```json
/// {
///     "alerts": [
///         {
///             "id": "alert-3f9a0c1d2e4b5a67",
///             "severity": "Critical",
///             "component": "Nutrient Tank A",
///             "message": "pH level above 6.5",
///             "timestamp": "5m ago",
///             "status": "Active"
///         }
///     ],
///     "summary": { "total": 4, "active": 1, "resolved": 3, "critical": 1, "warning": 2, "info": 1 },
///     "outcome": "success",
///     "stale": false,
///     "last_refreshed": "2024-01-15T10:30:00Z"
/// }
/// ```
///
/// Returns `503` when no data has ever been available, which is distinct from
/// an empty list.
#[instrument(skip(state))]
pub async fn get_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertsResponse>, StatusCode> {
    let filter = AlertFilter::parse(query.status.as_deref(), query.severity.as_deref())
        .map_err(|e| {
            warn!(error = %e, "Invalid alert filter");
            StatusCode::BAD_REQUEST
        })?;

    let snapshot = state.monitor.snapshot().await;
    if snapshot.is_unavailable() {
        warn!("No alert data available");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let response = AlertsResponse {
        alerts: filtered_view(&snapshot.display, &filter),
        summary: AlertSummary::from_alerts(snapshot.display.alerts()),
        outcome: snapshot.last_outcome,
        stale: snapshot.last_outcome.is_some_and(|o| o.is_stale()),
        last_refreshed: snapshot.last_refreshed,
    };

    info!(
        alert_count = response.alerts.len(),
        total = response.summary.total,
        stale = response.stale,
        "Alerts queried"
    );
    Ok(Json(response))
}

/// POST /alerts/refresh - Run a fetch cycle on demand.
///
/// Returns `422` with an `error` message when the farm context is incomplete.
#[instrument(skip(state))]
pub async fn refresh_alerts(State(state): State<AppState>) -> Response {
    match state.monitor.refresh().await {
        Ok(report) => {
            info!(report = report.label(), "Refresh requested");
            Json(RefreshResponse {
                report: report.label(),
                outcome: report.outcome(),
            })
            .into_response()
        }
        Err(e) => {
            warn!(error = %e, "Refresh rejected");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// POST /alerts/:id/resolve - Mark an alert resolved.
///
/// An id that is not on display is not an error: `found` is false.
#[instrument(skip(state))]
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ResolveResponse> {
    let id = AlertId::new(id);
    let found = state.monitor.resolve(&id).await;
    Json(ResolveResponse { id, found })
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
