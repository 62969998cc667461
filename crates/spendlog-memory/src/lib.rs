//! In-memory storage backend for spendlog.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    RwLock,
};

use spendlog_core::{
    storage::{RecordStore, StorageError},
    timestamp, CreateRecordCommand, Record, RecordPredicate,
};
use uuid::Uuid;

struct StoredRecord {
    sequence: u64,
    record: Record,
}

pub struct InMemoryStorage {
    records: RwLock<Vec<StoredRecord>>,
    sequence_counter: AtomicU64,
    closed: AtomicBool,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            sequence_counter: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Other("record lock poisoned".to_string())
}

impl RecordStore for InMemoryStorage {
    fn create(&self, command: &CreateRecordCommand) -> Result<Record, StorageError> {
        self.ensure_open()?;
        let record = command.to_record(Uuid::new_v4(), timestamp::now());

        let mut records = self.records.write().map_err(poisoned)?;
        records.push(StoredRecord {
            sequence: self.next_sequence(),
            record: record.clone(),
        });

        tracing::debug!(identity = %record.identity, kind = %record.kind, "Record created");
        Ok(record)
    }

    fn query(&self, predicate: &RecordPredicate) -> Result<Vec<Record>, StorageError> {
        self.ensure_open()?;
        if predicate.is_unsatisfiable() {
            return Ok(Vec::new());
        }

        let records = self.records.read().map_err(poisoned)?;
        let mut matching: Vec<&StoredRecord> = records
            .iter()
            .filter(|stored| predicate.matches(&stored.record))
            .collect();
        matching.sort_by(|a, b| {
            b.record
                .occurred_at
                .cmp(&a.record.occurred_at)
                .then(b.sequence.cmp(&a.sequence))
        });

        tracing::debug!(clauses = predicate.clauses().len(), matched = matching.len(), "Records queried");
        Ok(matching.into_iter().map(|stored| stored.record.clone()).collect())
    }

    fn health_check(&self) -> Result<(), StorageError> {
        self.ensure_open()
    }

    fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use spendlog_core::{RecordFilter, RecordKind};
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_create_assigns_unique_identity() {
        let storage = InMemoryStorage::new();
        let command = CreateRecordCommand::new(RecordKind::Expense, dec!(10));
        let a = storage.create(&command).unwrap();
        let b = storage.create(&command).unwrap();
        assert_ne!(a.identity, b.identity);
    }

    #[test]
    fn test_query_orders_most_recent_first() {
        let storage = InMemoryStorage::new();
        for day in [3, 1, 2] {
            let occurred_at = datetime!(2024-01-01 00:00:00 UTC) + time::Duration::days(day);
            storage
                .create(&CreateRecordCommand::new(RecordKind::Income, dec!(1)).with_occurred_at(occurred_at))
                .unwrap();
        }

        let days: Vec<u8> = storage
            .query(&RecordPredicate::all())
            .unwrap()
            .iter()
            .map(|r| r.occurred_at.day())
            .collect();
        assert_eq!(days, vec![4, 3, 2]);
    }

    #[test]
    fn test_equal_timestamps_newest_insert_first() {
        let storage = InMemoryStorage::new();
        let at = datetime!(2024-01-01 00:00:00 UTC);
        let first = storage
            .create(&CreateRecordCommand::new(RecordKind::Income, dec!(1)).with_occurred_at(at))
            .unwrap();
        let second = storage
            .create(&CreateRecordCommand::new(RecordKind::Income, dec!(2)).with_occurred_at(at))
            .unwrap();

        let all = storage.query(&RecordPredicate::all()).unwrap();
        assert_eq!(all, vec![second, first]);
    }

    #[test]
    fn test_query_returns_copies() {
        let storage = InMemoryStorage::new();
        storage
            .create(&CreateRecordCommand::new(RecordKind::Expense, dec!(5)).with_category("Food"))
            .unwrap();

        let mut first = storage.query(&RecordPredicate::all()).unwrap();
        first[0].category = Some("Changed".to_string());

        let again = storage.query(&RecordPredicate::all()).unwrap();
        assert_eq!(again[0].category.as_deref(), Some("Food"));
    }

    #[test]
    fn test_unsatisfiable_predicate_returns_empty() {
        let storage = InMemoryStorage::new();
        storage.create(&CreateRecordCommand::new(RecordKind::Expense, dec!(45))).unwrap();

        let predicate = RecordFilter {
            amount_min: Some(dec!(50)),
            amount_max: Some(dec!(40)),
            ..Default::default()
        }
        .predicate();
        assert!(storage.query(&predicate).unwrap().is_empty());
    }

    #[test]
    fn test_closed_store_rejects_operations() {
        let storage = InMemoryStorage::new();
        storage.close().unwrap();
        assert!(matches!(storage.health_check(), Err(StorageError::Closed)));
        assert!(matches!(
            storage.create(&CreateRecordCommand::new(RecordKind::Expense, dec!(1))),
            Err(StorageError::Closed)
        ));
    }
}
