//! Error types for Recast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecastError>;

#[derive(Error, Debug)]
pub enum RecastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Remote API error: {0}")]
    Api(#[from] ApiError),

    #[error("No eligible stored post for account {0}")]
    NoCandidate(i64),
}

impl RecastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RecastError::Api(ApiError::Authentication(_)) => 2,
            RecastError::NoCandidate(_) => 3,
            RecastError::Config(_) | RecastError::Database(_) | RecastError::Api(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown environment '{0}' (expected 'prod' or 'dev')")]
    UnknownEnvironment(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Response(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
