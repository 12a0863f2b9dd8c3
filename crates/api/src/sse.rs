//! Server-Sent Events stream for live engagement updates.
//!
//! Every connected client sees the shared broadcast stream; notification
//! events are filtered down to their recipient at this edge.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream, StreamExt};
use koinonia_core::LiveEvent;
use tokio_stream::wrappers::BroadcastStream;

use crate::{extractors::AuthUser, middleware::AppState};

async fn stream_handler(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.live.subscribe();
    let user_id = user.id;

    let live = BroadcastStream::new(receiver).filter_map(move |item| {
        let user_id = user_id.clone();
        async move {
            // A lagged receiver drops the missed events and continues.
            let event = item.ok()?;
            if let LiveEvent::Notification {
                user_id: ref target,
                ..
            } = event
                && *target != user_id
            {
                return None;
            }
            let sse = Event::default().json_data(&event).ok()?;
            Some(Ok(sse))
        }
    });

    let connected = stream::iter(
        Event::default()
            .json_data(&LiveEvent::Connected)
            .ok()
            .map(Ok),
    );

    Sse::new(connected.chain(live))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// Create the SSE router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(stream_handler))
}
