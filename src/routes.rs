//! HTTP surface: the chat gateway webhook and the direct opening endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::access::types::InboundPayload;
use crate::access::{AccessService, OpeningRequest, OpeningService};

/// Shared state for the relay routes.
#[derive(Clone)]
pub struct RelayState {
    pub access: Arc<AccessService>,
    pub opening: Arc<OpeningService>,
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// POST /v1/create/access-through-whatsapp
///
/// Runs the access pipeline for one gateway event. The status code mirrors
/// the outcome; the requester is notified over chat independently.
async fn access_through_whatsapp(
    State(state): State<RelayState>,
    Json(payload): Json<InboundPayload>,
) -> Response {
    let outcome = state.access.handle(payload).await;
    let body = outcome.response_body(state.access.config());
    (status(outcome.status_code()), Json(body)).into_response()
}

/// POST /v1/create/opening
async fn create_opening(
    State(state): State<RelayState>,
    Json(request): Json<OpeningRequest>,
) -> Response {
    let outcome = state.opening.open(request).await;
    (status(outcome.status_code()), Json(outcome.response_body())).into_response()
}

/// Build the relay router.
pub fn relay_routes(state: RelayState) -> Router {
    Router::new()
        .route(
            "/v1/create/access-through-whatsapp",
            post(access_through_whatsapp),
        )
        .route("/v1/create/opening", post(create_opening))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
