use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{read::Record, RecordKind};
use crate::timestamp;

/// A record that has not been persisted yet.
///
/// Request bodies reach this type through `validation::validate`; code
/// that already holds typed values may build one directly with `new` and
/// the `with_*` methods. Either way the kind and amount are typed, so a
/// store never sees an unknown kind or a missing amount.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRecordCommand {
    pub kind: RecordKind,
    pub amount: Decimal,
    pub note: Option<String>,
    pub category: Option<String>,
    pub occurred_at: Option<OffsetDateTime>,
}

impl CreateRecordCommand {
    pub fn new(kind: RecordKind, amount: Decimal) -> Self {
        Self {
            kind,
            amount,
            note: None,
            category: None,
            occurred_at: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_occurred_at(mut self, occurred_at: OffsetDateTime) -> Self {
        self.occurred_at = Some(timestamp::truncate_to_millis(occurred_at));
        self
    }

    /// Materializes the stored form: `now` fills a missing `occurred_at`.
    pub fn to_record(&self, identity: Uuid, now: OffsetDateTime) -> Record {
        Record {
            identity,
            kind: self.kind,
            amount: self.amount,
            note: self.note.clone(),
            category: self.category.clone(),
            occurred_at: timestamp::truncate_to_millis(self.occurred_at.unwrap_or(now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_to_record_defaults_occurred_at() {
        let now = datetime!(2024-05-05 08:30:00.123456 UTC);
        let record = CreateRecordCommand::new(RecordKind::Income, dec!(100))
            .with_note("salary")
            .to_record(Uuid::nil(), now);

        assert_eq!(record.occurred_at, datetime!(2024-05-05 08:30:00.123 UTC));
        assert_eq!(record.note.as_deref(), Some("salary"));
        assert_eq!(record.category, None);
    }

    #[test]
    fn test_to_record_keeps_supplied_occurred_at() {
        let supplied = datetime!(2023-01-01 00:00:00 UTC);
        let record = CreateRecordCommand::new(RecordKind::Expense, dec!(-3.25))
            .with_occurred_at(supplied)
            .to_record(Uuid::nil(), datetime!(2024-01-01 00:00:00 UTC));

        assert_eq!(record.occurred_at, supplied);
        assert_eq!(record.amount, dec!(-3.25));
    }

    #[test]
    fn test_builder_matches_validated_payload() {
        let payload: crate::RecordPayload = serde_json::from_value(serde_json::json!({
            "kind": "Expense",
            "amount": "7.25",
            "note": "parking",
            "category": "Transport",
            "occurredAt": "2024-02-02T10:00:00Z",
        }))
        .unwrap();

        let built = CreateRecordCommand::new(RecordKind::Expense, dec!(7.25))
            .with_note("parking")
            .with_category("Transport")
            .with_occurred_at(datetime!(2024-02-02 10:00:00 UTC));
        assert_eq!(crate::validate(payload).unwrap(), built);
    }
}
