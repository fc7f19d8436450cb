mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use common::TestServer;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn ws_url(base: &str) -> String {
    format!("ws{}/ws", base.strip_prefix("http").unwrap())
}

async fn connect(base: &str, token: &str) -> WsClient {
    let mut request = ws_url(base).into_client_request().unwrap();
    request.headers_mut().insert(
        "Authorization",
        format!("Bearer {token}").parse().unwrap(),
    );
    let (ws, _) = connect_async(request).await.expect("ws connect failed");
    ws
}

/// Next chat frame as JSON, skipping ping/pong control frames.
async fn next_json(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("ws error");
        if msg.is_text() {
            return serde_json::from_str(&msg.into_text().unwrap()).unwrap();
        }
    }
}

fn chat(content: &str) -> Message {
    Message::Text(
        serde_json::json!({ "type": "chat", "content": content })
            .to_string()
            .into(),
    )
}

#[tokio::test]
async fn test_ws_rejects_missing_token() {
    let server = TestServer::new().await;
    let base = server.spawn().await;

    let err = connect_async(ws_url(&base)).await.unwrap_err();
    match err {
        WsError::Http(response) => assert_eq!(response.status(), 401),
        other => panic!("expected HTTP 401 rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ws_rejects_invalid_token() {
    let server = TestServer::new().await;
    let base = server.spawn().await;

    let mut request = ws_url(&base).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Authorization", "Bearer not.a.token".parse().unwrap());
    let err = connect_async(request).await.unwrap_err();
    match err {
        WsError::Http(response) => assert_eq!(response.status(), 401),
        other => panic!("expected HTTP 401 rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_chat_is_echoed_to_sender() {
    let server = TestServer::new().await;
    let base = server.spawn().await;
    let alice = server.register_user("alice").await;

    let mut ws = connect(&base, &alice.access_token).await;
    ws.send(chat("hello there")).await.unwrap();

    let json = next_json(&mut ws).await;
    assert_eq!(json["type"], "chat");
    assert_eq!(json["content"], "hello there");
    assert_eq!(json["sender_name"], "alice");
    assert!(json["sender_id"].is_number());
    assert!(json["sent_at"].is_string());
}

#[tokio::test]
async fn test_chat_reaches_every_connected_client() {
    let server = TestServer::new().await;
    let base = server.spawn().await;
    let alice = server.register_user("alice").await;
    let bob = server.register_user("bob").await;

    let mut ws_alice = connect(&base, &alice.access_token).await;
    let mut ws_bob = connect(&base, &bob.access_token).await;
    while server.state.hub.session_count().await < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    ws_alice.send(chat("hi all")).await.unwrap();

    for ws in [&mut ws_alice, &mut ws_bob] {
        let json = next_json(ws).await;
        assert_eq!(json["content"], "hi all");
        assert_eq!(json["sender_name"], "alice");
    }
}

#[tokio::test]
async fn test_disconnect_does_not_stall_remaining_clients() {
    let server = TestServer::new().await;
    let base = server.spawn().await;
    let alice = server.register_user("alice").await;
    let bob = server.register_user("bob").await;

    let mut ws_alice = connect(&base, &alice.access_token).await;
    let mut ws_bob = connect(&base, &bob.access_token).await;
    while server.state.hub.session_count().await < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    ws_alice.close(None).await.unwrap();
    while server.state.hub.session_count().await > 1 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    ws_bob.send(chat("still here")).await.unwrap();
    let json = next_json(&mut ws_bob).await;
    assert_eq!(json["content"], "still here");
    assert_eq!(json["sender_name"], "bob");
}

#[tokio::test]
async fn test_malformed_frame_closes_connection() {
    let server = TestServer::new().await;
    let base = server.spawn().await;
    let alice = server.register_user("alice").await;

    let mut ws = connect(&base, &alice.access_token).await;
    ws.send(Message::Text("definitely not json".to_string().into()))
        .await
        .unwrap();

    // The server tears the session down; the client sees a close and then
    // the end of the stream.
    loop {
        match tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("server did not close the connection")
        {
            None => break,
            Some(Ok(Message::Close(_))) => {}
            Some(Ok(_)) => {}
            Some(Err(_)) => break,
        }
    }

    while server.state.hub.session_count().await > 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_empty_chat_frames_are_ignored() {
    let server = TestServer::new().await;
    let base = server.spawn().await;
    let alice = server.register_user("alice").await;

    let mut ws = connect(&base, &alice.access_token).await;
    ws.send(chat("")).await.unwrap();
    ws.send(chat("real message")).await.unwrap();

    let json = next_json(&mut ws).await;
    assert_eq!(json["content"], "real message");
}

#[tokio::test]
async fn test_server_sends_liveness_pings() {
    let server = TestServer::new().await;
    let base = server.spawn().await;
    let alice = server.register_user("alice").await;

    let mut ws = connect(&base, &alice.access_token).await;

    // The writer duty's heartbeat interval fires its first tick right away.
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for ping")
            .expect("stream ended")
            .expect("ws error");
        if let Message::Ping(_) = msg {
            break;
        }
    }
}
