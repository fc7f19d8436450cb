use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::db;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteUserRequest {
    pub username: String,
    pub email: String,
}

/// Deletes the account matching both username and email. Zero affected rows
/// means no such account and is answered with 404.
pub async fn delete_user(
    State(state): State<AppState>,
    Json(input): Json<DeleteUserRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let username = input.username.trim();
    let email = input.email.trim();
    if username.is_empty() || email.is_empty() {
        return Err(AppError::BadRequest(
            "username and email are required".to_string(),
        ));
    }

    let deleted = db::users::delete_user(&state.db, username, email).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("user not found".to_string()));
    }

    tracing::info!(username = %username, "user deleted");

    Ok(Json(serde_json::json!({
        "data": { "ok": true }
    })))
}
