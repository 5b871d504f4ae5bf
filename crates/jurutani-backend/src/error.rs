use thiserror::Error;

/// Errors produced by the backend boundary.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Generic persistence / network failure.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// A query expected a row but found none.
    #[error("Record not found")]
    NotFound,

    /// A unique constraint rejected the write (e.g. a concurrent insert of
    /// the same conversation pair).
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// The caller is not permitted to touch this row.
    #[error("Not permitted for this caller")]
    Unauthorized,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BackendError>;
