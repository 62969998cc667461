//! PostgreSQL storage backend for spendlog.
//!
//! Uses the synchronous `postgres` client, which drives its own runtime.
//! Callers inside an async context must go through a blocking thread.

use std::{sync::Mutex, time::Duration};

use postgres::{types::ToSql, Client, NoTls};
use spendlog_core::{
    sql::{self, RecordRow, SqlValue, ORDER_BY_RECENT, SELECT_RECORDS},
    storage::{RecordStore, StorageError},
    timestamp, CreateRecordCommand, Record, RecordPredicate,
};
use uuid::Uuid;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PostgresStorage {
    client: Mutex<Option<Client>>,
}

fn query_error(e: postgres::Error) -> StorageError {
    StorageError::Query(e.to_string())
}

fn to_postgres_param(value: SqlValue) -> Box<dyn ToSql + Sync> {
    match value {
        SqlValue::Text(s) => Box::new(s),
        SqlValue::Integer(i) => Box::new(i),
        SqlValue::Real(f) => Box::new(f),
    }
}

impl PostgresStorage {
    pub fn new(connection_string: &str) -> Result<Self, StorageError> {
        let client = Client::connect(connection_string, NoTls)
            .map_err(|e| StorageError::Connection(format!("PostgreSQL connection failed: {}", e)))?;

        let storage = Self {
            client: Mutex::new(Some(client)),
        };
        storage.init_schema()?;
        tracing::debug!("PostgreSQL record store opened");
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.with_client(|client| {
            client
                .batch_execute(
                    "
                CREATE TABLE IF NOT EXISTS records (
                    seq BIGSERIAL PRIMARY KEY,
                    id TEXT NOT NULL UNIQUE,
                    kind TEXT NOT NULL CHECK (kind IN ('Expense', 'Income')),
                    amount TEXT NOT NULL,
                    amount_value DOUBLE PRECISION NOT NULL,
                    note TEXT,
                    category TEXT,
                    occurred_at BIGINT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_records_occurred_at
                    ON records(occurred_at);
                ",
                )
                .map_err(query_error)
        })
    }

    fn with_client<T>(&self, f: impl FnOnce(&mut Client) -> Result<T, StorageError>) -> Result<T, StorageError> {
        let mut guard = self
            .client
            .lock()
            .map_err(|_| StorageError::Other("client lock poisoned".to_string()))?;
        let client = guard.as_mut().ok_or(StorageError::Closed)?;
        f(client)
    }
}

impl RecordStore for PostgresStorage {
    fn create(&self, command: &CreateRecordCommand) -> Result<Record, StorageError> {
        let record = command.to_record(Uuid::new_v4(), timestamp::now());
        let amount_value = sql::amount_to_f64(record.amount)?;

        self.with_client(|client| {
            client
                .execute(
                    "INSERT INTO records (id, kind, amount, amount_value, note, category, occurred_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                    &[
                        &record.identity.to_string(),
                        &record.kind.as_str(),
                        &record.amount.to_string(),
                        &amount_value,
                        &record.note,
                        &record.category,
                        &timestamp::to_unix_millis(record.occurred_at),
                    ],
                )
                .map_err(query_error)
        })?;

        tracing::debug!(identity = %record.identity, kind = %record.kind, "Record created");
        Ok(record)
    }

    fn query(&self, predicate: &RecordPredicate) -> Result<Vec<Record>, StorageError> {
        if predicate.is_unsatisfiable() {
            return Ok(Vec::new());
        }

        let filter = sql::where_clause(predicate, |i| format!("${}", i))?;
        let query = format!("{}{} {}", SELECT_RECORDS, filter.clause, ORDER_BY_RECENT);
        let params: Vec<Box<dyn ToSql + Sync>> = filter.params.into_iter().map(to_postgres_param).collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref()).collect();

        let rows = self.with_client(|client| client.query(query.as_str(), &param_refs).map_err(query_error))?;

        tracing::debug!(clauses = predicate.clauses().len(), candidates = rows.len(), "Records queried");
        rows.iter()
            .map(|row| {
                RecordRow {
                    id: row.try_get(0).map_err(query_error)?,
                    kind: row.try_get(1).map_err(query_error)?,
                    amount: row.try_get(2).map_err(query_error)?,
                    note: row.try_get(3).map_err(query_error)?,
                    category: row.try_get(4).map_err(query_error)?,
                    occurred_at: row.try_get(5).map_err(query_error)?,
                }
                .into_record()
            })
            .filter(|record| record.as_ref().map_or(true, |r| predicate.matches(r)))
            .collect()
    }

    fn health_check(&self) -> Result<(), StorageError> {
        self.with_client(|client| {
            client
                .is_valid(HEALTH_CHECK_TIMEOUT)
                .map_err(|e| StorageError::Connection(e.to_string()))
        })
    }

    fn close(&self) -> Result<(), StorageError> {
        let mut guard = self
            .client
            .lock()
            .map_err(|_| StorageError::Other("client lock poisoned".to_string()))?;
        if let Some(client) = guard.take() {
            client.close().map_err(|e| StorageError::Other(e.to_string()))?;
            tracing::debug!("PostgreSQL record store closed");
        }
        Ok(())
    }
}
