//! Core error types for the wallet sync engine.
//!
//! This module defines database-agnostic error types. Storage-specific
//! errors (from whatever backs the ledger) are converted to these types by
//! the storage layer.

use thiserror::Error;

use walletfolio_chain_data::errors::ChainDataError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the sync engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Chain data operation failed: {0}")]
    ChainData(#[from] ChainDataError),

    #[error("Ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Validation errors for user input.
///
/// These are fatal for the call that triggered them and are never retried.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Database-agnostic error type for ledger operations.
///
/// String details let the storage layer convert whatever its driver throws
/// into this format.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The `(portfolio_id, transaction_hash)` uniqueness constraint fired.
    /// Callers treat this as a late-detected duplicate, not a failure.
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A query failed to execute.
    #[error("Ledger query failed: {0}")]
    QueryFailed(String),

    /// The backing store could not be reached.
    #[error("Failed to connect to ledger store: {0}")]
    ConnectionFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
