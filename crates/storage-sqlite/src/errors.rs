//! Storage-layer error type and its bridge into the core error.

use diecast_core::errors::{DatabaseError, Error as CoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database query error: {0}")]
    Diesel(#[from] diesel::result::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Writer unavailable: {0}")]
    Writer(String),
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Pool(e) => CoreError::Database(DatabaseError::Pool(e.to_string())),
            StorageError::Diesel(e) => {
                CoreError::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::Migration(message) => {
                CoreError::Database(DatabaseError::Internal(message))
            }
            StorageError::Writer(message) => CoreError::Database(DatabaseError::Internal(message)),
        }
    }
}
