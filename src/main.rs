use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use todo_service::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    models::{Role, User},
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

// Identity seeded into the in-memory store so local runs can use the `x-user-id` bypass.
const LOCAL_DEV_USER: Uuid = Uuid::from_u128(1);

/// main
///
/// Entry point. Initializes the components in order: configuration, logging, the
/// persistence backend, shared state and finally the HTTP server.
///
/// Any failure before the server is listening is fatal.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // `.env` is read first so AppConfig sees its values.
    dotenv::dotenv().ok();
    // Panics in production when DATABASE_URL or JWT_SECRET is missing.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins when set; otherwise debug for this crate and info for HTTP traces.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "todo_service=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: pretty, multi-line output for reading in a terminal.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: one JSON object per line for log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Persistence Initialization
    // Postgres when DATABASE_URL is set (always in production), in-memory otherwise.
    let repo: RepositoryState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            let postgres = PostgresRepository::new(pool);
            // Schema is applied on every start; already-applied migrations are skipped.
            postgres
                .migrate()
                .await
                .expect("FATAL: Failed to apply database migrations.");
            Arc::new(postgres)
        }
        None => {
            // LOCAL-ONLY: nothing survives a restart. A known user is seeded so the
            // `x-user-id` bypass works out of the box.
            let memory = InMemoryRepository::new();
            memory
                .insert_user(User {
                    id: LOCAL_DEV_USER,
                    name: Some("Local Developer".to_string()),
                    email: Some("dev@localhost".to_string()),
                    role: Some(Role::User),
                })
                .await;
            tracing::warn!(
                "DATABASE_URL not set; using in-memory storage. Send `x-user-id: {}` to authenticate.",
                LOCAL_DEV_USER
            );
            Arc::new(memory)
        }
    };

    // 5. Unified State Assembly and Router
    let app = create_router(AppState::new(repo, config.clone()));

    // 6. Server Startup
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .expect("FATAL: Failed to bind listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", config.bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    // Runs until the process is stopped.
    axum::serve(listener, app).await.expect("FATAL: server error");
}
