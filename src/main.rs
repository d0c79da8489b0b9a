use student_api::{
    AppState, BcryptPasswordVerifier, InMemoryUserRepository, PostgresUserRepository,
    config::{AppConfig, Env},
    create_router,
    repository::RepositoryState,
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, collaborators, security core, HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "student_api=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Token Codec (Fail-Fast on a weak secret)
    let codec = config
        .token_codec()
        .unwrap_or_else(|e| panic!("FATAL: invalid token configuration: {e}"));

    // 5. Account Lookup
    let repo: RepositoryState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            Arc::new(PostgresUserRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using an empty in-memory account store");
            Arc::new(InMemoryUserRepository::new())
        }
    };

    // 6. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(
        repo,
        Arc::new(BcryptPasswordVerifier::default()),
        codec,
        config,
    );
    tracing::info!(rules = app_state.table.rules().len(), "authorization table built");

    // 7. Router and Server Startup
    let app = create_router(app_state, Router::new());

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: cannot bind {bind_addr}: {e}"));

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", e);
    }
}
