use tokio::net::TcpListener;

use parley::config::{Config, Env};
use parley::gateway::hub::Hub;
use parley::state::AppState;
use parley::token::TokenService;

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    init_tracing(&config);
    print_banner(&config);

    let db = parley::db::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");

    let hub = Hub::spawn();
    let tokens = TokenService::new(&config.jwt_secret, &config.jwt_issuer);

    let state = AppState {
        db,
        hub: hub.clone(),
        tokens,
    };

    let app = parley::routes::router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind");

    let actual_port = listener
        .local_addr()
        .expect("failed to get local address")
        .port();
    eprintln!("  \x1b[32m→ listening on 0.0.0.0:{actual_port}\x1b[0m");
    eprintln!();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await
        .expect("server error");
}

fn init_tracing(config: &Config) {
    let default_filter = match config.env {
        Env::Prod => "parley=info",
        _ => "parley=debug,tower_http=debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match config.env {
        Env::Local => tracing_subscriber::fmt().with_env_filter(filter).init(),
        Env::Dev | Env::Prod => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
    }
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");

    eprintln!();
    eprintln!("  \x1b[1;36mparley\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2menv\x1b[0m       {}", config.env);
    eprintln!("  \x1b[2mport\x1b[0m      {}", config.port);
    eprintln!("  \x1b[2mdatabase\x1b[0m  {}", config.database_url);
    eprintln!();
}

/// Waits for ctrl-c, then asks the hub to drop every live session so their
/// reader/writer tasks unblock and the server can drain.
async fn shutdown_signal(hub: Hub) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for shutdown signal");
    tracing::info!("shutdown signal received, closing gateway sessions");
    hub.shutdown();
}
