use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::db;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let username = input.username.trim();
    if username.len() < 4 || username.len() > 24 {
        return Err(AppError::BadRequest(
            "username must be between 4 and 24 characters".to_string(),
        ));
    }

    let email = input.email.trim();
    if !is_valid_email(email) {
        return Err(AppError::BadRequest("email is not valid".to_string()));
    }

    validate_password(&input.password)?;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(input.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?
        .to_string();

    let user = db::users::create_user(&state.db, username, email, &password_hash).await?;
    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    let pair = state
        .tokens
        .generate_pair(user.id)
        .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

    Ok(Json(serde_json::json!({
        "data": {
            "username": user.username,
            "access_token": pair.access_token,
            "refresh_token": pair.refresh_token
        }
    })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (user_id, stored_hash) = db::users::get_credentials(&state.db, input.username.trim())
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_string()))?;

    let parsed_hash = PasswordHash::new(&stored_hash)
        .map_err(|e| AppError::Internal(format!("stored hash parse failed: {e}")))?;

    if Argon2::default()
        .verify_password(input.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized("invalid credentials".to_string()));
    }

    let pair = state
        .tokens
        .generate_pair(user_id)
        .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

    Ok(Json(serde_json::json!({
        "data": {
            "username": input.username.trim(),
            "access_token": pair.access_token,
            "refresh_token": pair.refresh_token
        }
    })))
}

/// Exchanges a still-valid refresh token (bearer in the `Authorization`
/// header) for a fresh access/refresh pair.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let raw = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing refresh token".to_string()))?;

    let claims = state
        .tokens
        .validate(raw)
        .map_err(|_| AppError::Unauthorized("invalid refresh token".to_string()))?;

    let user_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::Unauthorized("invalid refresh token".to_string()))?;

    let pair = state
        .tokens
        .generate_pair(user_id)
        .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

    Ok(Json(serde_json::json!({
        "data": {
            "access_token": pair.access_token,
            "refresh_token": pair.refresh_token
        }
    })))
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 || password.len() > 24 {
        return Err(AppError::BadRequest(
            "password must be between 8 and 24 characters".to_string(),
        ));
    }
    if !password.chars().any(|c| matches!(c, '!' | '@' | '#' | '?')) {
        return Err(AppError::BadRequest(
            "password must contain at least one of !@#?".to_string(),
        ));
    }
    Ok(())
}
