use std::sync::Arc;

use spendlog_core::{
    validate, Record, RecordFilter, RecordPayload, RecordQueryParams, RecordStore, StorageError,
    ValidationError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Validates input and runs it against the store. Holds no state of its
/// own, so one instance is shared by every request.
pub struct RecordService {
    store: Arc<dyn RecordStore>,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    #[tracing::instrument(skip_all)]
    pub fn create(&self, payload: RecordPayload) -> Result<Record, ServiceError> {
        let command = validate(payload).map_err(|e| {
            tracing::debug!(error = %e, "Rejected record");
            metrics::increment_counter!("spendlog_validation_failures_total");
            e
        })?;

        let record = self.store.create(&command).map_err(storage_failure)?;

        metrics::increment_counter!("spendlog_records_created_total", "kind" => record.kind.as_str());
        tracing::info!(identity = %record.identity, kind = %record.kind, "Record added");
        Ok(record)
    }

    #[tracing::instrument(skip_all)]
    pub fn query(&self, params: &RecordQueryParams) -> Result<Vec<Record>, ServiceError> {
        let filter = RecordFilter::from_params(params).map_err(|e| {
            tracing::debug!(error = %e, "Rejected query");
            metrics::increment_counter!("spendlog_validation_failures_total");
            e
        })?;

        self.query_filter(&filter)
    }

    pub fn query_filter(&self, filter: &RecordFilter) -> Result<Vec<Record>, ServiceError> {
        let predicate = filter.predicate();
        let records = self.store.query(&predicate).map_err(storage_failure)?;

        metrics::increment_counter!("spendlog_record_queries_total");
        metrics::histogram!("spendlog_query_result_size", records.len() as f64);
        Ok(records)
    }
}

fn storage_failure(e: StorageError) -> StorageError {
    tracing::error!(error = %e, "Record store failure");
    metrics::increment_counter!("spendlog_storage_failures_total");
    e
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;
    use spendlog_core::{RecordKind, RecordPredicate};
    use spendlog_memory::InMemoryStorage;

    use super::*;

    fn service() -> RecordService {
        RecordService::new(Arc::new(InMemoryStorage::new()))
    }

    fn payload(value: serde_json::Value) -> RecordPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_then_query() {
        let service = service();
        let created = service
            .create(payload(json!({"kind": "Expense", "amount": 42.5, "category": "Food"})))
            .unwrap();
        assert_eq!(created.kind, RecordKind::Expense);
        assert_eq!(created.amount, dec!(42.5));

        let found = service.query(&RecordQueryParams::default()).unwrap();
        assert_eq!(found, vec![created]);
    }

    #[test]
    fn test_invalid_payload_never_reaches_store() {
        let service = service();
        let err = service
            .create(payload(json!({"kind": "Neither", "amount": 1})))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidKind(_))));
        assert!(service.store().query(&RecordPredicate::all()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_query_is_validation_error() {
        let params = RecordQueryParams {
            amount_max: Some("lots".to_string()),
            ..Default::default()
        };
        assert!(matches!(service().query(&params), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_storage_failure_is_storage_error() {
        let store = Arc::new(InMemoryStorage::new());
        store.close().unwrap();
        let service = RecordService::new(store);

        let err = service
            .create(payload(json!({"kind": "Income", "amount": 5})))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(StorageError::Closed)));
    }
}
