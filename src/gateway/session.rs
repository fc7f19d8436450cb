use axum::extract::ws::Utf8Bytes;
use tokio::sync::{mpsc, watch};

/// The handle the hub keeps for one connected client.
///
/// `tx` feeds the session's bounded outbound queue, drained in order by the
/// writer duty. `stop` is never written to; the hub dropping this handle
/// closes both channels, which is what tells the reader and writer duties
/// to wind down.
#[derive(Debug)]
pub struct SessionHandle {
    pub session_id: String,
    pub user_id: i64,
    pub username: String,
    pub tx: mpsc::Sender<Utf8Bytes>,
    pub stop: watch::Sender<()>,
}
