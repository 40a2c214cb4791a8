//! Per-session progress channels shared between the upload and subscription
//! request paths.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// One progress update for an upload session
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub total_files: usize,
    pub current_index: usize,
    pub done: bool,
}

/// Channel state for a single session
struct SessionChannel {
    tx: UnboundedSender<ProgressEvent>,
    /// Receiving half, claimed by at most one subscriber.
    rx: Mutex<Option<UnboundedReceiver<ProgressEvent>>>,
}

impl SessionChannel {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }
}

/// Registry of progress channels, keyed by caller-supplied session id.
///
/// Constructed once at startup and shared by reference between the upload and
/// progress routes. Channels are unbounded so the processing path never
/// blocks on a slow or absent subscriber; a send attempted after the entry
/// was removed fails and is dropped by the caller.
///
/// Entries are removed by the subscriber side when its stream ends. An entry
/// created by an upload whose session never gains a subscriber keeps its
/// buffered events until the process exits, so session ids must not be
/// reused across uploads.
pub struct ProgressRegistry {
    channels: DashMap<String, SessionChannel>,
}

impl Default for ProgressRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Sender for a session, creating the channel if absent.
    ///
    /// Safe under concurrent calls from the upload and subscription paths;
    /// both land on the same channel.
    pub fn sender(&self, session_id: &str) -> UnboundedSender<ProgressEvent> {
        self.channels
            .entry(session_id.to_string())
            .or_insert_with(SessionChannel::new)
            .tx
            .clone()
    }

    /// Take the receiving half for a session, creating the channel if absent.
    ///
    /// Each channel has a single consumer; returns `None` when the receiver
    /// was already claimed.
    pub fn take_receiver(&self, session_id: &str) -> Option<UnboundedReceiver<ProgressEvent>> {
        let entry = self
            .channels
            .entry(session_id.to_string())
            .or_insert_with(SessionChannel::new);
        entry.rx.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Delete a session's channel; safe to call when the session is unknown.
    pub fn remove(&self, session_id: &str) {
        if self.channels.remove(session_id).is_some() {
            debug!(session_id = %session_id, "Removed progress channel");
        }
    }
}
