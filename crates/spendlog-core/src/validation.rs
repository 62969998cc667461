//! Schema checks applied to caller input before anything touches a store.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{models::write::CreateRecordCommand, timestamp, RecordKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("`{0}` is not a valid kind, expected `Expense` or `Income`")]
    InvalidKind(String),
    #[error("{field} must be a number, got `{value}`")]
    InvalidAmount { field: &'static str, value: String },
    #[error("{field} `{value}` is outside the supported decimal range")]
    AmountOutOfRange { field: &'static str, value: String },
    #[error("{field} must be an ISO-8601 timestamp, got `{value}`")]
    InvalidTimestamp { field: &'static str, value: String },
}

/// Raw create-record body as received over the wire.
///
/// `amount` stays an untyped JSON value so numeric strings can be accepted
/// and everything else reported with a field-specific message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayload {
    pub kind: Option<String>,
    pub amount: Option<Value>,
    pub note: Option<String>,
    pub category: Option<String>,
    pub occurred_at: Option<String>,
}

pub fn validate(payload: RecordPayload) -> Result<CreateRecordCommand, ValidationError> {
    let kind = match payload.kind.as_deref() {
        None | Some("") => return Err(ValidationError::MissingField("kind")),
        Some(kind) => RecordKind::from_str(kind)?,
    };

    let amount = match payload.amount {
        None | Some(Value::Null) => return Err(ValidationError::MissingField("amount")),
        Some(Value::Number(n)) => parse_amount("amount", &n.to_string())?,
        Some(Value::String(s)) => parse_amount("amount", &s)?,
        Some(other) => {
            return Err(ValidationError::InvalidAmount {
                field: "amount",
                value: other.to_string(),
            })
        }
    };

    let occurred_at = payload
        .occurred_at
        .as_deref()
        .map(|value| timestamp::parse("occurredAt", value))
        .transpose()?;

    Ok(CreateRecordCommand {
        kind,
        amount,
        note: payload.note,
        category: payload.category,
        occurred_at,
    })
}

/// Parses a decimal, allowing scientific notation. Values outside the
/// representable range are rejected rather than clamped.
pub fn parse_amount(field: &'static str, value: &str) -> Result<Decimal, ValidationError> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| {
            let value = value.to_string();
            // Numeric text that still failed above cannot fit a Decimal.
            match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => ValidationError::AmountOutOfRange { field, value },
                _ => ValidationError::InvalidAmount { field, value },
            }
        })
}
