//! SQLite storage backend for spendlog.

use std::sync::Mutex;

use rusqlite::{params, params_from_iter, types::Value, Connection};
use spendlog_core::{
    sql::{self, RecordRow, SqlValue, ORDER_BY_RECENT, SELECT_RECORDS},
    storage::{RecordStore, StorageError},
    timestamp, CreateRecordCommand, Record, RecordPredicate,
};
use uuid::Uuid;

pub struct SqliteStorage {
    conn: Mutex<Option<Connection>>,
}

fn query_error(e: rusqlite::Error) -> StorageError {
    StorageError::Query(e.to_string())
}

fn to_sqlite_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Integer(i) => Value::Integer(i),
        SqlValue::Real(f) => Value::Real(f),
    }
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`; `:memory:` gives a
    /// private in-memory database.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let storage = Self {
            conn: Mutex::new(Some(conn)),
        };
        storage.init_schema()?;
        tracing::debug!(path, "SQLite record store opened");
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS records (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    kind TEXT NOT NULL CHECK (kind IN ('Expense', 'Income')),
                    amount TEXT NOT NULL,
                    amount_value REAL NOT NULL,
                    note TEXT,
                    category TEXT,
                    occurred_at INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_records_occurred_at
                    ON records(occurred_at);
                ",
            )
            .map_err(query_error)
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, StorageError>) -> Result<T, StorageError> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| StorageError::Other("connection lock poisoned".to_string()))?;
        let conn = guard.as_ref().ok_or(StorageError::Closed)?;
        f(conn)
    }
}

impl RecordStore for SqliteStorage {
    fn create(&self, command: &CreateRecordCommand) -> Result<Record, StorageError> {
        let record = command.to_record(Uuid::new_v4(), timestamp::now());
        let amount_value = sql::amount_to_f64(record.amount)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO records (id, kind, amount, amount_value, note, category, occurred_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.identity.to_string(),
                    record.kind.as_str(),
                    record.amount.to_string(),
                    amount_value,
                    record.note,
                    record.category,
                    timestamp::to_unix_millis(record.occurred_at),
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

        let filter = sql::where_clause(predicate, |i| format!("?{}", i))?;
        let query = format!("{}{} {}", SELECT_RECORDS, filter.clause, ORDER_BY_RECENT);
        let params: Vec<Value> = filter.params.into_iter().map(to_sqlite_value).collect();

        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&query).map_err(query_error)?;
            let rows = stmt
                .query_map(params_from_iter(params), |row| {
                    Ok(RecordRow {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        amount: row.get(2)?,
                        note: row.get(3)?,
                        category: row.get(4)?,
                        occurred_at: row.get(5)?,
                    })
                })
                .map_err(query_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
        })?;

        tracing::debug!(clauses = predicate.clauses().len(), candidates = rows.len(), "Records queried");
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = row.into_record()?;
            if predicate.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn health_check(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(|e| StorageError::Connection(e.to_string()))
        })
    }

    fn close(&self) -> Result<(), StorageError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StorageError::Other("connection lock poisoned".to_string()))?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StorageError::Other(e.to_string()))?;
            tracing::debug!("SQLite record store closed");
        }
        Ok(())
    }
}
