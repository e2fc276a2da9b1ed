//! Server-sent notification stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures_util::{Stream, StreamExt};
use tracing::info;

use super::viewer::RequireViewer;
use super::AppState;
use crate::notify::StreamSession;

/// `GET /api/v1/notifications/stream`
///
/// The stream ends when the client disconnects or the server shuts down;
/// either way the viewer's subscription is released.
pub async fn stream_notifications(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(viewer_id, "Opening notification stream");

    let session = StreamSession::new(
        Arc::clone(state.service.broker()),
        viewer_id,
        state.config.heartbeat_interval,
        state.shutdown.child_token(),
    );

    let events = session.into_stream().map(|frame| {
        Ok(Event::default()
            .event(frame.event_name())
            .data(frame.payload()))
    });

    Sse::new(events)
}
