use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::Stream;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};

use super::AppState;
use crate::api::HelloResponse;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/hello", get(hello))
        .route("/notifications", get(stream_notifications))
}

async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from the boards backend!".to_string(),
    })
}

/// Server-sent `notification` events, one per heartbeat.
async fn stream_notifications(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("Notification listener connected");

    let stream = BroadcastStream::new(state.notifications.subscribe()).filter_map(|message| {
        match message {
            Ok(notification) => match Event::default()
                .event("notification")
                .json_data(&notification)
            {
                Ok(event) => Some(Ok(event)),
                Err(err) => {
                    tracing::error!(error = %err, "Failed to encode notification");
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Notification listener lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
