use serde::{Deserialize, Serialize};
use std::fmt;

/// Single-valued equality predicate selecting a subset of a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a serialized row satisfies this predicate.
    ///
    /// Scalars are compared through their text form so that `42` matches
    /// the filter value `"42"`.
    pub fn matches(&self, row: &serde_json::Value) -> bool {
        match row.get(&self.field) {
            Some(serde_json::Value::String(s)) => s == &self.value,
            Some(serde_json::Value::Number(n)) => n.to_string() == self.value,
            Some(serde_json::Value::Bool(b)) => b.to_string() == self.value,
            _ => false,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.field, self.value)
    }
}

/// What a `select` call should return
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub filter: Option<Filter>,
    /// Page size cap; `None` loads every matching row
    pub limit: Option<usize>,
}

impl Selection {
    pub fn new(filter: Option<Filter>, limit: Option<usize>) -> Self {
        Self { filter, limit }
    }

    pub fn all() -> Self {
        Self::default()
    }
}
