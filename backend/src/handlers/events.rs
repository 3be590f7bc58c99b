//! Server-Sent Events stream of domain events

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::AppState;

/// Stream domain events to connected dashboards.
///
/// Lagged subscribers silently skip the events they missed; delivery is
/// at-least-once only for connected, keeping-up receivers.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.events.subscribe();

    let stream = BroadcastStream::new(receiver).filter_map(|result| match result {
        Ok(event) => {
            let name = event.name();
            match serde_json::to_string(&event) {
                Ok(json) => Some(Ok::<_, Infallible>(Event::default().event(name).data(json))),
                Err(e) => {
                    tracing::error!("Failed to serialize domain event: {}", e);
                    None
                }
            }
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
