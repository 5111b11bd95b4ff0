use thiserror::Error;

/// Failure taxonomy for store and distribution operations.
///
/// Every variant is reported synchronously to the triggering caller; the
/// core never retries. Multi-step sequences run inside a single SQLite
/// transaction, so a `Store` failure mid-sequence rolls back rather than
/// leaving a partially-applied redistribution.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or duplicate input, rejected before any mutation.
    #[error("{0}")]
    Validation(String),

    /// The operation targets a resource that does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller is not allowed to perform this operation.
    #[error("{0}")]
    Forbidden(String),

    /// Import or individual lead creation with an empty agent roster.
    #[error("no agents available to distribute leads")]
    NoAgents,

    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Credential hashing failure. Carries no caller-supplied data.
    #[error("failed to hash credential")]
    Credential,
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
