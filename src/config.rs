use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Env {
    Local,
    Dev,
    Prod,
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Env::Local => write!(f, "local"),
            Env::Dev => write!(f, "dev"),
            Env::Prod => write!(f, "prod"),
        }
    }
}

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub env: Env,
    pub jwt_secret: String,
    pub jwt_issuer: String,
}

impl Config {
    pub fn from_env() -> Self {
        let env = match std::env::var("PARLEY_ENV")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "prod" => Env::Prod,
            "dev" => Env::Dev,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Prod => {
                std::env::var("PARLEY_JWT_SECRET").expect("PARLEY_JWT_SECRET is required in prod")
            }
            _ => std::env::var("PARLEY_JWT_SECRET")
                .unwrap_or_else(|_| "parley-dev-secret".to_string()),
        };

        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:parley.db?mode=rwc".to_string()),
            env,
            jwt_secret,
            jwt_issuer: std::env::var("PARLEY_JWT_ISSUER").unwrap_or_else(|_| "parley".to_string()),
        }
    }
}
