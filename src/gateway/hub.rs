//! The connection hub: single owner of the live-session set.
//!
//! All membership changes and broadcasts funnel through one mpsc intake into
//! one coordination task, so the session map is only ever touched by a single
//! actor and commands take effect in exactly the order they were submitted.
//! Fan-out never awaits a recipient: each session has a bounded outbound
//! queue and a full queue is fatal for that session — a client that cannot
//! keep up is evicted rather than allowed to stall everyone else or silently
//! lose an unbounded amount of history.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use super::frames::{ChatMessage, ServerFrame};
use super::session::SessionHandle;

/// Bound on each session's outbound queue. Overflowing it evicts the session.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

enum Command {
    Register(SessionHandle),
    Unregister(String),
    Broadcast(ChatMessage),
    Count(oneshot::Sender<usize>),
    Shutdown,
}

/// Cloneable handle to the hub task. All methods are non-blocking sends onto
/// the hub's intake; they are processed strictly in submission order.
#[derive(Clone)]
pub struct Hub {
    tx: mpsc::UnboundedSender<Command>,
}

impl Hub {
    /// Spawns the coordination task and returns a handle to it.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx));
        Self { tx }
    }

    pub fn register(&self, session: SessionHandle) {
        let _ = self.tx.send(Command::Register(session));
    }

    /// Removes a session if present. Safe to call more than once for the
    /// same id: the reader and writer duties of a failing session both
    /// report here.
    pub fn unregister(&self, session_id: &str) {
        let _ = self.tx.send(Command::Unregister(session_id.to_string()));
    }

    /// Queues a message for delivery to every currently registered session.
    pub fn broadcast(&self, message: ChatMessage) {
        let _ = self.tx.send(Command::Broadcast(message));
    }

    pub async fn session_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Command::Count(tx)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Drops every session and stops the coordination task. Dropping the
    /// handles unblocks all reader/writer duties, so teardown completes in
    /// time proportional to the number of live sessions.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut roster = Roster::new();
    while let Some(command) = rx.recv().await {
        match command {
            Command::Register(session) => roster.register(session),
            Command::Unregister(session_id) => roster.unregister(&session_id),
            Command::Broadcast(message) => roster.broadcast(&message),
            Command::Count(reply) => {
                let _ = reply.send(roster.len());
            }
            Command::Shutdown => break,
        }
    }
    tracing::debug!(sessions = roster.len(), "hub stopped");
}

/// The authoritative membership set. Only the hub task touches it.
struct Roster {
    sessions: HashMap<String, SessionHandle>,
}

impl Roster {
    fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }

    fn register(&mut self, session: SessionHandle) {
        match self.sessions.entry(session.session_id.clone()) {
            Entry::Occupied(_) => {
                // Ids are freshly generated per connection; a collision is a
                // programming error, not a runtime condition.
                debug_assert!(false, "duplicate session id {}", session.session_id);
                tracing::error!(
                    session_id = %session.session_id,
                    "duplicate session id at registration, dropping the new session"
                );
            }
            Entry::Vacant(entry) => {
                tracing::debug!(
                    session_id = %session.session_id,
                    user_id = session.user_id,
                    "session registered"
                );
                entry.insert(session);
            }
        }
    }

    fn unregister(&mut self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            tracing::debug!(session_id, "session unregistered");
        }
    }

    fn broadcast(&mut self, message: &ChatMessage) {
        let frame: Utf8Bytes = match serde_json::to_string(&ServerFrame::from(message)) {
            Ok(text) => text.into(),
            Err(err) => {
                tracing::error!(%err, "failed to encode chat frame");
                return;
            }
        };

        let mut evicted = Vec::new();
        for (session_id, session) in &self.sessions {
            match session.tx.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        session_id = %session_id,
                        user_id = session.user_id,
                        "outbound queue full, evicting slow consumer"
                    );
                    evicted.push(session_id.clone());
                }
                Err(TrySendError::Closed(_)) => {
                    // Writer already gone; unregistration is in flight.
                    evicted.push(session_id.clone());
                }
            }
        }
        for session_id in evicted {
            self.sessions.remove(&session_id);
        }
    }
}
