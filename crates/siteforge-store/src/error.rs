//! Store errors.

/// Errors returned by [`crate::Database`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration v{version} failed: {message}")]
    Migration { version: i64, message: String },

    #[error("Slug '{0}' is already taken")]
    SlugTaken(String),

    #[error("Domain '{0}' is already registered")]
    DomainTaken(String),

    #[error("Corrupt value in {table}.{column}: {message}")]
    Corrupt {
        table: &'static str,
        column: &'static str,
        message: String,
    },
}

impl StoreError {
    pub(crate) fn corrupt(table: &'static str, column: &'static str, message: impl ToString) -> Self {
        Self::Corrupt {
            table,
            column,
            message: message.to_string(),
        }
    }
}

/// Whether a sqlx error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}
