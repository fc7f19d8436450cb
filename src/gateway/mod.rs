pub mod frames;
pub mod heartbeat;
pub mod hub;
pub mod session;

use axum::body::Bytes;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use uuid::Uuid;

use crate::db;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use frames::{ChatMessage, ClientFrame};
use heartbeat::{HEARTBEAT_INTERVAL, HEARTBEAT_TIMEOUT, WRITE_TIMEOUT};
use hub::{Hub, OUTBOUND_QUEUE_CAPACITY};
use session::SessionHandle;

/// Largest accepted chat payload, in bytes.
const MAX_CONTENT_LEN: usize = 4000;

/// Authenticated WebSocket entry point. The `AuthUser` extractor runs before
/// the upgrade, so an invalid or missing token is answered with 401 and the
/// connection never touches the hub.
pub async fn ws_upgrade(
    auth: AuthUser,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, auth))
}

async fn handle_socket(socket: WebSocket, state: AppState, auth: AuthUser) {
    // The account may have been deleted after the token was issued.
    let user = match db::users::get_user(&state.db, auth.user_id).await {
        Ok(user) => user,
        Err(_) => return,
    };

    let session_id = Uuid::new_v4().to_string();
    let (frame_tx, frame_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let (stop_tx, stop_rx) = watch::channel(());
    let (pong_tx, pong_rx) = watch::channel(Instant::now());

    state.hub.register(SessionHandle {
        session_id: session_id.clone(),
        user_id: user.id,
        username: user.username.clone(),
        tx: frame_tx,
        stop: stop_tx,
    });
    tracing::debug!(session_id = %session_id, user_id = user.id, "gateway session connected");

    let (sink, stream) = socket.split();

    let writer = tokio::spawn(write_outbound(
        sink,
        frame_rx,
        stop_rx.clone(),
        pong_rx,
        state.hub.clone(),
        session_id.clone(),
    ));

    // This task is the reader duty.
    read_inbound(
        stream,
        stop_rx,
        pong_tx,
        &state.hub,
        &session_id,
        user.id,
        &user.username,
    )
    .await;

    let _ = writer.await;
    tracing::debug!(session_id = %session_id, "gateway session closed");
}

/// Reads inbound frames until the client closes, the connection fails, a
/// frame is malformed, or the hub drops this session. Chat frames are handed
/// to the hub stamped with the session's authenticated identity and a server
/// timestamp; membership itself is only ever changed by the hub.
async fn read_inbound(
    mut stream: SplitStream<WebSocket>,
    mut stop_rx: watch::Receiver<()>,
    pong_tx: watch::Sender<Instant>,
    hub: &Hub,
    session_id: &str,
    user_id: i64,
    username: &str,
) {
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                // The hub dropped this session's handle (eviction or shutdown).
                if changed.is_err() {
                    break;
                }
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(ClientFrame::Chat { content }) => {
                            if content.is_empty() {
                                continue;
                            }
                            if content.len() > MAX_CONTENT_LEN {
                                tracing::debug!(session_id, "oversized chat frame, closing");
                                break;
                            }
                            hub.broadcast(ChatMessage {
                                sender_id: user_id,
                                sender_name: username.to_string(),
                                content,
                                sent_at: chrono::Utc::now(),
                            });
                        }
                        Err(err) => {
                            tracing::debug!(session_id, %err, "undecodable frame, closing");
                            break;
                        }
                    }
                }
                Some(Ok(Message::Pong(_))) => {
                    let _ = pong_tx.send(Instant::now());
                }
                // The socket layer queues the pong reply itself.
                Some(Ok(Message::Ping(_))) => {}
                // The chat protocol is text only.
                Some(Ok(Message::Binary(_))) => break,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(_)) => break,
            }
        }
    }
    hub.unregister(session_id);
}

/// Drains the session's outbound queue onto the socket in enqueue order and
/// keeps the connection alive with periodic pings. Exits on write failure, a
/// missed pong deadline, or the hub dropping the session's queue.
async fn write_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<Utf8Bytes>,
    mut stop_rx: watch::Receiver<()>,
    pong_rx: watch::Receiver<Instant>,
    hub: Hub,
    session_id: String,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            frame = frames.recv() => match frame {
                Some(frame) => {
                    match tokio::time::timeout(WRITE_TIMEOUT, sink.send(Message::Text(frame))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) | Err(_) => break,
                    }
                }
                // The hub dropped the queue: evicted or unregistered.
                None => break,
            },
            _ = heartbeat.tick() => {
                if pong_rx.borrow().elapsed() > HEARTBEAT_TIMEOUT {
                    tracing::debug!(session_id = %session_id, "heartbeat timed out");
                    break;
                }
                match tokio::time::timeout(WRITE_TIMEOUT, sink.send(Message::Ping(Bytes::new()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) | Err(_) => break,
                }
            }
        }
    }
    hub.unregister(&session_id);
    let _ = sink.close().await;
}
