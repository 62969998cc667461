use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

pub mod read;
pub mod write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Expense,
    Income,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Expense => "Expense",
            RecordKind::Income => "Income",
        }
    }
}

impl FromStr for RecordKind {
    type Err = ValidationError;

    /// Case-sensitive: only the canonical spellings are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Expense" => Ok(RecordKind::Expense),
            "Income" => Ok(RecordKind::Income),
            other => Err(ValidationError::InvalidKind(other.to_string())),
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
