use sqlx::{Row, SqlitePool};

use crate::error::AppError;
use crate::models::user::User;

fn row_to_user(row: sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    }
}

const SELECT_USERS: &str = "SELECT id, username, email, created_at FROM users";

pub async fn get_user(pool: &SqlitePool, user_id: i64) -> Result<User, AppError> {
    let row = sqlx::query(&format!("{SELECT_USERS} WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("unknown_user".to_string()))?;

    Ok(row_to_user(row))
}

pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    let result = sqlx::query("INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)")
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .await;

    let result = match result {
        Ok(result) => result,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Conflict("user already exists".to_string()));
        }
        Err(e) => return Err(AppError::from(e)),
    };

    get_user(pool, result.last_insert_rowid()).await
}

/// Credentials lookup for login: `(id, password_hash)` if the username exists.
pub async fn get_credentials(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<(i64, String)>, AppError> {
    let row = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, password_hash FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Deletes the row matching both username and email. Returns the number of
/// rows removed so the handler can distinguish "deleted" from "no such user".
pub async fn delete_user(pool: &SqlitePool, username: &str, email: &str) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE username = ? AND email = ?")
        .bind(username)
        .bind(email)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
