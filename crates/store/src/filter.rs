//! Filter operations for store queries

use serde_json::Value;

use crate::error::StoreError;
use crate::Document;

/// A single-field predicate for `RemoteStore::get_filtered`
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value
    Eq { field: String, value: Value },

    /// Array field contains the value
    ArrayContains { field: String, value: Value },
}

impl Filter {
    /// Equality filter
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Array-contains filter
    pub fn array_contains(field: &str, value: impl Into<Value>) -> Self {
        Filter::ArrayContains {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// The field the filter applies to
    pub fn field(&self) -> &str {
        match self {
            Filter::Eq { field, .. } | Filter::ArrayContains { field, .. } => field,
        }
    }

    /// Evaluate the filter against a record held in memory.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::Eq { field, value } => document.get(field) == Some(value),
            Filter::ArrayContains { field, value } => document
                .get(field)
                .and_then(Value::as_array)
                .map(|items| items.contains(value))
                .unwrap_or(false),
        }
    }

    /// PostgREST operator string, e.g. `eq.abc` or `cs.["abc"]`.
    pub(crate) fn to_query_value(&self) -> Result<String, StoreError> {
        match self {
            Filter::Eq { value, .. } => match value {
                Value::String(s) => Ok(format!("eq.{}", s)),
                Value::Bool(_) | Value::Number(_) => Ok(format!("eq.{}", value)),
                Value::Null => Ok("is.null".to_string()),
                _ => Err(StoreError::InvalidParameters(format!(
                    "eq filter on '{}' needs a scalar value",
                    self.field()
                ))),
            },
            Filter::ArrayContains { value, .. } => {
                let value_str = serde_json::to_string(&Value::Array(vec![value.clone()]))?;
                Ok(format!("cs.{}", value_str))
            }
        }
    }
}
