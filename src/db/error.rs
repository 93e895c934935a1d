use thiserror::Error;

/// Errors surfaced by the repositories.
#[derive(Debug, Error)]
pub enum DbError {
    /// Row is missing or belongs to another organization.
    #[error("Not found")]
    NotFound,

    /// A unique index rejected the write (duplicate email, token hash).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The database returned something the schema should make impossible.
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DbResult<T> = Result<T, DbError>;
