use serde::Serialize;

/// A registered account row. The password hash never leaves the db layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: String,
}
