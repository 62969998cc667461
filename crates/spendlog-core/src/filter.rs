//! Query filter builder.
//!
//! Request parameters are parsed into a typed [`RecordFilter`], which is
//! translated into a [`RecordPredicate`]: a flat list of clauses that all
//! have to hold. The translation is pure and does not second-guess the
//! caller; an inverted range simply yields a predicate nothing satisfies.

use rust_decimal::Decimal;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    models::{read::Record, RecordKind},
    timestamp,
    validation::{parse_amount, ValidationError},
};

/// Raw query string parameters. Empty values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQueryParams {
    pub kind: Option<String>,
    pub category: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub amount_min: Option<String>,
    pub amount_max: Option<String>,
}

/// Typed filter options; every field is independent and optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub kind: Option<RecordKind>,
    pub category: Option<String>,
    pub date_from: Option<OffsetDateTime>,
    pub date_to: Option<OffsetDateTime>,
    pub amount_min: Option<Decimal>,
    pub amount_max: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    KindEquals(RecordKind),
    CategoryEquals(String),
    OccurredFrom(OffsetDateTime),
    OccurredUntil(OffsetDateTime),
    AmountAtLeast(Decimal),
    AmountAtMost(Decimal),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPredicate {
    clauses: Vec<Clause>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl RecordFilter {
    pub fn from_params(params: &RecordQueryParams) -> Result<Self, ValidationError> {
        Ok(Self {
            kind: present(&params.kind)
                .map(|v| v.parse::<RecordKind>())
                .transpose()?,
            category: present(&params.category).map(str::to_string),
            date_from: present(&params.date_from)
                .map(|v| timestamp::parse("dateFrom", v))
                .transpose()?,
            date_to: present(&params.date_to)
                .map(|v| timestamp::parse("dateTo", v))
                .transpose()?,
            amount_min: present(&params.amount_min)
                .map(|v| parse_amount("amountMin", v))
                .transpose()?,
            amount_max: present(&params.amount_max)
                .map(|v| parse_amount("amountMax", v))
                .transpose()?,
        })
    }

    pub fn predicate(&self) -> RecordPredicate {
        let mut clauses = Vec::new();

        if let Some(kind) = self.kind {
            clauses.push(Clause::KindEquals(kind));
        }
        if let Some(category) = &self.category {
            clauses.push(Clause::CategoryEquals(category.clone()));
        }
        if let Some(from) = self.date_from {
            clauses.push(Clause::OccurredFrom(from));
        }
        if let Some(to) = self.date_to {
            clauses.push(Clause::OccurredUntil(to));
        }
        if let Some(min) = self.amount_min {
            clauses.push(Clause::AmountAtLeast(min));
        }
        if let Some(max) = self.amount_max {
            clauses.push(Clause::AmountAtMost(max));
        }

        RecordPredicate { clauses }
    }
}

impl TryFrom<&RecordQueryParams> for RecordFilter {
    type Error = ValidationError;

    fn try_from(params: &RecordQueryParams) -> Result<Self, Self::Error> {
        Self::from_params(params)
    }
}

impl Clause {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Clause::KindEquals(kind) => record.kind == *kind,
            Clause::CategoryEquals(category) => record.category.as_deref() == Some(category.as_str()),
            Clause::OccurredFrom(from) => record.occurred_at >= *from,
            Clause::OccurredUntil(to) => record.occurred_at <= *to,
            Clause::AmountAtLeast(min) => record.amount >= *min,
            Clause::AmountAtMost(max) => record.amount <= *max,
        }
    }
}

impl RecordPredicate {
    /// The predicate without clauses; matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }

    /// True when the clauses contradict each other, e.g. a lower date bound
    /// after the upper one. Stores may answer such a query without looking.
    pub fn is_unsatisfiable(&self) -> bool {
        let mut kind = None;
        let mut category = None;
        let mut from = None;
        let mut until = None;
        let mut min = None;
        let mut max = None;

        for clause in &self.clauses {
            match clause {
                Clause::KindEquals(k) => {
                    if kind.is_some_and(|seen| seen != *k) {
                        return true;
                    }
                    kind = Some(*k);
                }
                Clause::CategoryEquals(c) => {
                    if category.is_some_and(|seen: &String| seen != c) {
                        return true;
                    }
                    category = Some(c);
                }
                Clause::OccurredFrom(t) => from = from.max(Some(*t)),
                Clause::OccurredUntil(t) => until = Some(until.map_or(*t, |u: OffsetDateTime| u.min(*t))),
                Clause::AmountAtLeast(a) => min = min.max(Some(*a)),
                Clause::AmountAtMost(a) => max = Some(max.map_or(*a, |m: Decimal| m.min(*a))),
            }
        }

        matches!((from, until), (Some(f), Some(u)) if f > u)
            || matches!((min, max), (Some(lo), Some(hi)) if lo > hi)
    }
}

impl From<&RecordFilter> for RecordPredicate {
    fn from(filter: &RecordFilter) -> Self {
        filter.predicate()
    }
}
