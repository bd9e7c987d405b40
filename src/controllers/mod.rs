//! HTTP surface. Every route lives under `/api`.

pub mod boards;
pub mod notifications;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    api::{ErrorBody, Notification},
    error::BoardError,
    services::BoardService,
};

#[derive(Clone)]
pub struct AppState {
    pub boards: BoardService,
    pub notifications: broadcast::Sender<Notification>,
}

pub fn create_router(state: AppState, cors_allow_origins: &[String]) -> Router {
    let api = Router::new()
        .merge(boards::routes())
        .merge(notifications::routes());

    Router::new()
        .nest("/api", api)
        .layer(cors_layer(cors_allow_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}

/// Error response with an `{"error": message}` body.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<BoardError> for HttpError {
    fn from(err: BoardError) -> Self {
        if err.is_client_error() {
            tracing::warn!(error = %err, "Request rejected");
            return HttpError::bad_request(err.to_string());
        }

        tracing::error!(error = %err, "Request failed");
        HttpError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}
