//! Error types shared by the engine and the query builders

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the engine can report.
///
/// `Clone` so that a single statement failure can be returned to the caller
/// and published on the transaction's error subscription.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A statement was executed a second time.
    #[error("statement has already been executed")]
    AlreadyExecuted,

    /// The connection registry was used before a dialector was configured.
    #[error("database dialector has not been initialized")]
    DialectorNotInitialized,

    /// A single-entity lookup found no row.
    #[error("not found: {id}")]
    NotFound { id: String },

    /// Strict read of a statement result that was never published.
    #[error("statement result has not been set")]
    ResultNotSet,

    /// The transaction actor has already terminated.
    #[error("transaction is closed")]
    TransactionClosed,

    /// The physical BEGIN failed; the transaction never served a statement.
    #[error("failed to begin transaction: {0}")]
    Begin(Box<Error>),

    #[error("statement timed out after {after:?}")]
    Timeout { after: Duration },

    /// The submitting caller went away before the statement finished.
    #[error("statement was cancelled")]
    Cancelled,

    /// An earlier statement was interrupted mid-flight, so the transaction can
    /// only be rolled back.
    #[error("transaction aborted after an interrupted statement")]
    Aborted,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[source] Arc<sqlx::Error>),
}

impl Error {
    pub fn not_found(id: impl Into<String>) -> Self {
        Error::NotFound { id: id.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Database(Arc::new(err))
    }
}

/// Extension trait for logging errors with context on their way up
pub trait LogErr<T> {
    /// Log the error at `error` level and return the result unchanged
    fn log_err(self, context: &str) -> Result<T>;

    /// Log the error at `warn` level and drop it
    fn warn_ok(self, context: &str) -> Option<T>;
}

impl<T> LogErr<T> for Result<T> {
    fn log_err(self, context: &str) -> Result<T> {
        self.inspect_err(|e| tracing::error!(error = %e, "{}", context))
    }

    fn warn_ok(self, context: &str) -> Option<T> {
        self.inspect_err(|e| tracing::warn!(error = %e, "{}", context)).ok()
    }
}
