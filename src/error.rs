//! Error type shared by the store, the collector and the query facade.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("{0}")]
    Validation(String),

    #[error("Game not found: {0}")]
    NotFound(u64),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, TrackerError>;
