use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// The identity a valid bearer token resolves to. Extracting this is the
/// access gate in front of every protected route, including the WebSocket
/// upgrade: a request that fails here never reaches the hub.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Rejection type for when auth fails.
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": "unauthorized",
                "message": "invalid or missing authentication"
            }
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthRejection;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let tokens = state.tokens.clone();
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        async move {
            let raw = auth_header
                .as_deref()
                .and_then(|header| header.strip_prefix("Bearer "))
                .ok_or(AuthRejection)?;

            let claims = tokens.validate(raw).map_err(|_| AuthRejection)?;
            let user_id = claims.sub.parse::<i64>().map_err(|_| AuthRejection)?;

            Ok(AuthUser { user_id })
        }
    }
}
