#![allow(dead_code)]

use axum::body::Body;
use http::{Method, Request, StatusCode};
use sqlx::SqlitePool;
use tower::ServiceExt;

use parley::db;
use parley::gateway::hub::Hub;
use parley::routes;
use parley::state::AppState;
use parley::token::TokenService;

/// A user created through the registration endpoint, bundling the username
/// with the issued token pair.
pub struct RegisteredUser {
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl RegisteredUser {
    /// Returns the Authorization header value (`"Bearer xxx"`).
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Test server that owns an in-memory SQLite pool and full AppState.
/// Each instance is isolated — safe for parallel tests.
pub struct TestServer {
    pub state: AppState,
}

impl TestServer {
    /// Create a new TestServer with an in-memory SQLite database.
    pub async fn new() -> Self {
        let pool = db::create_pool("sqlite::memory:")
            .await
            .expect("failed to create test pool");

        let state = AppState {
            db: pool,
            hub: Hub::spawn(),
            tokens: TokenService::new("test-secret", "parley-test"),
        };

        Self { state }
    }

    /// Returns an Axum Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    /// Returns a reference to the underlying SQLite pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.state.db
    }

    /// Binds a TCP listener on port 0, spawns the server, and returns the base URL.
    pub async fn spawn(&self) -> String {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{}", addr.port())
    }

    /// Registers a user through the HTTP handler and returns the token pair.
    pub async fn register_user(&self, username: &str) -> RegisteredUser {
        let body = serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "hunter2!pass"
        });
        let response = self
            .router()
            .oneshot(json_request(Method::POST, "/api/v1/auth/register", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "registration failed");
        let json = parse_body(response).await;

        RegisteredUser {
            username: username.to_string(),
            access_token: json["data"]["access_token"].as_str().unwrap().to_string(),
            refresh_token: json["data"]["refresh_token"].as_str().unwrap().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request builder helpers
// ---------------------------------------------------------------------------

/// Build an authenticated request with no body.
pub fn authenticated_request(method: Method, uri: &str, auth_header: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", auth_header)
        .body(Body::empty())
        .unwrap()
}

/// Build an unauthenticated request with a JSON body.
pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Parse a response body into a `serde_json::Value`.
pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
