//! Operational health endpoint.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Returns health information as JSON.
///
/// Always 200; the `state` field says whether the server is accepting work.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "state": state.shutdown.health_state().as_str(),
        "services": state.dispatcher.registry().len(),
        "in_flight": state.shutdown.in_flight_count(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}
