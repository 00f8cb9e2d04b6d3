pub mod dict2ini;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("dict2ini expects a mapping of sections, got {0}")]
    NotAMapping(&'static str),

    #[error("section '{section}' must be a mapping of options, got {found}")]
    SectionNotMapping {
        section: String,
        found: &'static str,
    },

    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Signature shared by every filter: input value plus the `quote` flag.
pub type FilterFn = fn(&Value, bool) -> Result<Value, FilterError>;

/// Filters exposed to a templating host, keyed by name.
pub fn filters() -> Vec<(&'static str, FilterFn)> {
    vec![(dict2ini::NAME, dict2ini::filter as FilterFn)]
}

pub fn lookup(name: &str) -> Option<FilterFn> {
    filters()
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| f)
}

pub(crate) fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
