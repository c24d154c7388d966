//! HTTP surface for the dispatch gateway.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    gateway::{DispatchError, DispatchGateway, DispatchRequest},
    protocol::{HealthResponse, SendResponse},
};

impl DispatchError {
    /// HTTP status for this failure kind.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::ProviderDispatchFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(SendResponse::failure(self.to_string()))).into_response()
    }
}

/// Build the gateway router with `POST /send` and `GET /health`.
///
/// # Example
/// ```ignore
/// let app = create_router(Arc::new(gateway));
/// axum::serve(listener, app).await?;
/// ```
#[must_use]
pub fn create_router(gateway: Arc<DispatchGateway>) -> Router {
    Router::new()
        .route("/send", post(send_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

async fn send_handler(
    State(gateway): State<Arc<DispatchGateway>>,
    body: Result<Json<DispatchRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, DispatchError> {
    let Json(request) = body.map_err(|e| {
        tracing::warn!("Invalid send request: {e}");
        DispatchError::InvalidRequest(e.body_text())
    })?;

    gateway.dispatch(&request).await?;
    Ok(Json(SendResponse::sent()))
}

async fn health_handler(State(gateway): State<Arc<DispatchGateway>>) -> Json<HealthResponse> {
    Json(gateway.health().into())
}
