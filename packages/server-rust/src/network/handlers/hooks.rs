//! Per-service discovery and event routes, plus the root liveness probe.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use hookshot_core::HookService;
use http::StatusCode;

use super::AppState;
use crate::service::DispatchOutcome;

/// Body returned for events that arrive after shutdown was triggered.
pub const DRAINING_BODY: &str = "Server Shutting Down";

/// `GET /` liveness probe.
pub async fn root_handler() -> &'static str {
    "ok"
}

/// Routes for one service: `GET /<hook>` returns its title and
/// `POST /<hook>/{event}` dispatches to it.
///
/// The service is bound to its routes here, at boot, so a request never
/// needs a registry lookup.
pub fn service_routes(service: Arc<dyn HookService>) -> Router<AppState> {
    let hook = service.hook_name();
    let title = service.title();

    Router::new()
        .route(&format!("/{hook}"), get(move || async move { title }))
        .route(
            &format!("/{hook}/{{event}}"),
            post(
                move |state: State<AppState>,
                      event: Path<String>,
                      headers: HeaderMap,
                      query: RawQuery,
                      body: Bytes| {
                    dispatch_handler(Arc::clone(&service), state, event, headers, query, body)
                },
            ),
        )
}

/// Runs one event request through the dispatcher. The request counts as in
/// flight until the outcome, and any reports, are done.
///
/// Once shutdown is triggered new events get a 503 without reaching the
/// service.
pub async fn dispatch_handler(
    service: Arc<dyn HookService>,
    State(state): State<AppState>,
    Path(event): Path<String>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> DispatchOutcome {
    if state.shutdown.is_shutting_down() {
        return DispatchOutcome::new(StatusCode::SERVICE_UNAVAILABLE, DRAINING_BODY);
    }
    let _in_flight = state.shutdown.in_flight_guard();
    state
        .dispatcher
        .dispatch(service.as_ref(), &event, &headers, query.as_deref(), &body)
        .await
}
