//! Core types and traits for spendlog storage backends.
//!
//! This crate owns the record model, input validation, the query filter
//! builder and the `RecordStore` trait, so storage implementations can
//! live in separate crates.

pub mod filter;
pub mod models;
pub mod sql;
pub mod storage;
pub mod timestamp;
pub mod validation;

// Re-export key types at crate root for convenience
pub use filter::{Clause, RecordFilter, RecordPredicate, RecordQueryParams};
pub use models::read::Record;
pub use models::write::CreateRecordCommand;
pub use models::RecordKind;
pub use storage::{RecordStore, StorageError};
pub use validation::{validate, RecordPayload, ValidationError};
