use thiserror::Error;

use crate::{
    filter::RecordPredicate,
    models::{read::Record, write::CreateRecordCommand},
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("store is closed")]
    Closed,
    #[error("{0}")]
    Other(String),
}

/// Persistence for records. Implementations own their connection and are
/// shared across request handlers behind an `Arc<dyn RecordStore>`.
pub trait RecordStore: Send + Sync {
    /// Persists one record, assigning its identity and defaulting
    /// `occurred_at` to the current time.
    fn create(&self, command: &CreateRecordCommand) -> Result<Record, StorageError>;

    /// All records matching `predicate`, most recent `occurred_at` first.
    fn query(&self, predicate: &RecordPredicate) -> Result<Vec<Record>, StorageError>;

    fn health_check(&self) -> Result<(), StorageError>;

    /// Releases the underlying connection. Later calls fail with
    /// [`StorageError::Closed`].
    fn close(&self) -> Result<(), StorageError>;
}
