//! Shared SQL rendering for the relational backends.
//!
//! Both the SQLite and the PostgreSQL store use the same `records` table
//! layout; only the placeholder syntax differs.

use std::str::FromStr;

use rust_decimal::{prelude::ToPrimitive, Decimal};
use uuid::Uuid;

use crate::{
    filter::{Clause, RecordPredicate},
    models::{read::Record, RecordKind},
    storage::StorageError,
    timestamp,
};

pub const SELECT_RECORDS: &str =
    "SELECT id, kind, amount, note, category, occurred_at FROM records";

pub const ORDER_BY_RECENT: &str = "ORDER BY occurred_at DESC, seq DESC";

/// A bound parameter, converted by each backend into its driver's type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlWhere {
    /// Either empty or a fragment starting with ` WHERE `.
    pub clause: String,
    pub params: Vec<SqlValue>,
}

/// Relative and absolute slack applied to amount bounds in SQL. The
/// `amount_value` column is an f64 shadow of the exact decimal, so SQL only
/// narrows the candidate rows; callers re-check them with
/// [`RecordPredicate::matches`].
const AMOUNT_SLACK: f64 = 1e-9;

fn widen(bound: f64) -> f64 {
    bound.abs() * AMOUNT_SLACK + AMOUNT_SLACK
}

pub fn amount_to_f64(amount: Decimal) -> Result<f64, StorageError> {
    amount
        .to_f64()
        .ok_or_else(|| StorageError::Query(format!("amount {} is not representable", amount)))
}

/// Renders `predicate` against the `records` columns. `placeholder` maps a
/// 1-based parameter index to the driver's syntax.
///
/// Amount bounds come out slightly looser than requested, never tighter,
/// so the result is a superset of the matching rows.
pub fn where_clause(
    predicate: &RecordPredicate,
    placeholder: impl Fn(usize) -> String,
) -> Result<SqlWhere, StorageError> {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    for clause in predicate.clauses() {
        let (column, op, value) = match clause {
            Clause::KindEquals(kind) => ("kind", "=", SqlValue::Text(kind.as_str().to_string())),
            Clause::CategoryEquals(category) => ("category", "=", SqlValue::Text(category.clone())),
            Clause::OccurredFrom(t) => ("occurred_at", ">=", SqlValue::Integer(timestamp::to_unix_millis(*t))),
            Clause::OccurredUntil(t) => ("occurred_at", "<=", SqlValue::Integer(timestamp::to_unix_millis(*t))),
            Clause::AmountAtLeast(a) => ("amount_value", ">=", {
                let bound = amount_to_f64(*a)?;
                SqlValue::Real(bound - widen(bound))
            }),
            Clause::AmountAtMost(a) => ("amount_value", "<=", {
                let bound = amount_to_f64(*a)?;
                SqlValue::Real(bound + widen(bound))
            }),
        };
        params.push(value);
        conditions.push(format!("{} {} {}", column, op, placeholder(params.len())));
    }

    if conditions.is_empty() {
        return Ok(SqlWhere::default());
    }

    Ok(SqlWhere {
        clause: format!(" WHERE {}", conditions.join(" AND ")),
        params,
    })
}

/// Column values of one `records` row, as read back from a driver.
#[derive(Debug, Clone)]
pub struct RecordRow {
    pub id: String,
    pub kind: String,
    pub amount: String,
    pub note: Option<String>,
    pub category: Option<String>,
    pub occurred_at: i64,
}

impl RecordRow {
    pub fn into_record(self) -> Result<Record, StorageError> {
        let corrupt = |reason: String| StorageError::Corrupt {
            id: self.id.clone(),
            reason,
        };

        let identity = Uuid::parse_str(&self.id).map_err(|e| corrupt(e.to_string()))?;
        let kind = RecordKind::from_str(&self.kind).map_err(|e| corrupt(e.to_string()))?;
        let amount = Decimal::from_str(&self.amount).map_err(|e| corrupt(format!("invalid amount: {}", e)))?;
        let occurred_at = timestamp::from_unix_millis(self.occurred_at)
            .map_err(|e| corrupt(format!("invalid occurred_at: {}", e)))?;

        Ok(Record {
            identity,
            kind,
            amount,
            note: self.note,
            category: self.category,
            occurred_at,
        })
    }
}
