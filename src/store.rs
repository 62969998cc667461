//! Record store lifecycle: open the configured backend, probe it, close it.

use std::sync::Arc;

use spendlog_core::{RecordStore, StorageError};
use spendlog_memory::InMemoryStorage;
use spendlog_postgres::PostgresStorage;
use spendlog_sqlite::SqliteStorage;

use crate::config::{StorageBackend, StorageConfig};

/// Opens the configured backend and verifies it answers. Blocking: call it
/// off the async runtime.
pub fn open(config: &StorageConfig) -> Result<Arc<dyn RecordStore>, StorageError> {
    let store: Arc<dyn RecordStore> = match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; records are lost on shutdown");
            Arc::new(InMemoryStorage::new())
        }
        StorageBackend::Sqlite => {
            tracing::info!(path = %config.path, "Opening SQLite record store");
            Arc::new(SqliteStorage::new(&config.path)?)
        }
        StorageBackend::Postgres => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| StorageError::Connection("no PostgreSQL connection string configured".to_string()))?;
            tracing::info!("Opening PostgreSQL record store");
            Arc::new(PostgresStorage::new(url)?)
        }
    };

    store.health_check()?;
    Ok(store)
}

pub fn close(store: Arc<dyn RecordStore>) -> Result<(), StorageError> {
    store.close()?;
    drop(store);
    tracing::info!("Record store closed");
    Ok(())
}
