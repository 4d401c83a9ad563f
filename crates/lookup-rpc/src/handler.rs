//! HTTP request handlers for lookup routes.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lookup_plugin::{LookupOutcome, LookupRequest, Route, WireResponse};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Convert a logical wire response into an HTTP response.
pub fn into_http(response: WireResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, response.content_type)],
        response.body,
    )
        .into_response()
}

/// Serve one lookup.
///
/// The function body runs on the blocking pool: it may take arbitrarily long
/// and must not stall the runtime's worker threads.
pub async fn handle_lookup(
    State(route): State<Arc<Route>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    debug!("Lookup {}({:?})", route.path, params);

    let request = LookupRequest::from_query(&params);
    let task_route = route.clone();
    let outcome = match tokio::task::spawn_blocking(move || task_route.invoke(&request)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // Panics are caught inside invoke, so only cancellation lands here.
            error!("Lookup task for {} did not complete: {}", route.path, e);
            LookupOutcome::Failed(e.to_string())
        }
    };

    into_http(outcome.into())
}

/// Any method other than GET or HEAD on a lookup route.
pub async fn handle_method_not_allowed() -> Response {
    into_http(WireResponse::method_not_allowed())
}

/// Paths that name no registered function.
pub async fn handle_route_not_found() -> Response {
    into_http(WireResponse::route_not_found())
}
