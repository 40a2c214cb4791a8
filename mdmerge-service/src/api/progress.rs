//! Server-Sent Events progress endpoint.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use tracing::debug;

use crate::progress::ProgressEvent;
use crate::service::MergeService;

use super::AppState;

/// Removes a session's progress channel when the stream is dropped, whether
/// by completion, idle timeout, or client disconnect.
struct SessionCleanup {
    service: Arc<MergeService>,
    session_id: String,
}

impl Drop for SessionCleanup {
    fn drop(&mut self) {
        debug!(session_id = %self.session_id, "Progress subscriber gone");
        self.service.progress.remove(&self.session_id);
    }
}

/// SSE events for one claimed receiver.
///
/// Re-emits each progress event as one message. The stream ends after the
/// `done = true` event, when the channel closes, or when no event arrives
/// within `idle`.
fn event_stream(
    mut rx: UnboundedReceiver<ProgressEvent>,
    idle: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        loop {
            match timeout(idle, rx.recv()).await {
                Ok(Some(event)) => {
                    let done = event.done;
                    if let Ok(msg) = Event::default().json_data(&event) {
                        yield Ok(msg);
                    }
                    if done {
                        break;
                    }
                }
                // Channel closed, or nothing arrived within the idle window.
                Ok(None) | Err(_) => break,
            }
        }
    }
}

/// Handle `GET /progress/{session_id}`.
pub async fn progress_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let service = state.service.clone();
    let idle = service.config.processing.idle_timeout();
    let receiver = service.progress.take_receiver(&session_id);

    let stream = async_stream::stream! {
        // A second subscriber for the same session finds the receiver
        // already claimed and gets an empty stream.
        let Some(rx) = receiver else { return };
        let _guard = SessionCleanup { service, session_id };

        let events = event_stream(rx, idle);
        futures::pin_mut!(events);
        while let Some(item) = events.next().await {
            yield item;
        }
    };

    Sse::new(stream)
}
