// Per-request deadline
//
// Dropping the handler future on timeout is safe: services only touch the
// capability index after the store write, with no await in between.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use mesh_services::ServiceError;
use tracing::warn;

use crate::common::{ApiError, ApiState};

pub async fn enforce_request_deadline(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    match tokio::time::timeout(state.request_timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            let timeout_ms = state.request_timeout.as_millis() as u64;
            warn!(%method, %uri, timeout_ms, "request deadline exceeded");
            ApiError::from(ServiceError::Timeout(timeout_ms)).into_response()
        }
    }
}
