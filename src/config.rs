use std::env;

const LOCAL_JWT_SECRET: &str = "local-dev-jwt-secret-change-me";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// AppConfig
///
/// Immutable configuration loaded once at startup and shared through the application state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    /// Runtime environment marker. Controls the `x-user-id` development bypass.
    pub env: Env,
    /// Shared secret used to validate incoming JWTs.
    pub jwt_secret: String,
    /// Address the HTTP server listens on.
    pub bind_addr: String,
}

/// Env
///
/// Local development vs. hardened production runtime.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Test configuration: local, in-memory, fixed secret. Reads no environment variables.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads configuration from the environment.
    ///
    /// # Panics
    /// In production, panics when `DATABASE_URL` or `JWT_SECRET` is missing, so the service
    /// never starts against an in-memory store or with the development secret.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                bind_addr,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production"),
                ),
                jwt_secret: env::var("JWT_SECRET")
                    .expect("FATAL: JWT_SECRET must be set in production."),
                bind_addr,
            },
        }
    }
}
