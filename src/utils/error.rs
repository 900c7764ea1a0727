use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Decimal parse error: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Cannot move page {page_id}: {reason}")]
    InvalidMove { page_id: i64, reason: String },

    #[error("Slug '{slug}' is already in use under parent {parent_id}")]
    SlugConflict { slug: String, parent_id: i64 },
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
