use sqlx::SqlitePool;

use crate::gateway::hub::Hub;
use crate::token::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub hub: Hub,
    pub tokens: TokenService,
}
