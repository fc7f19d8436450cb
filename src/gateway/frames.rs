//! Wire frames for the chat gateway.
//!
//! Chat traffic is tagged JSON text (`{"type": "chat", ...}`); liveness and
//! teardown use the WebSocket control frames (ping/pong/close), which are
//! never fanned out to other clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as the hub fans it out: sender identity is resolved
/// server-side from the session, never trusted from the payload, and the
/// timestamp is assigned on receipt. Immutable once built.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub sender_id: i64,
    pub sender_name: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Messages sent from clients to the server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Chat { content: String },
}

/// Messages sent from the server to connected clients.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Chat {
        sender_id: i64,
        sender_name: String,
        content: String,
        sent_at: DateTime<Utc>,
    },
}

impl From<&ChatMessage> for ServerFrame {
    fn from(message: &ChatMessage) -> Self {
        ServerFrame::Chat {
            sender_id: message.sender_id,
            sender_name: message.sender_name.clone(),
            content: message.content.clone(),
            sent_at: message.sent_at,
        }
    }
}
