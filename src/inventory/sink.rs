use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InventoryError {
    #[error("group '{0}' does not exist")]
    NoSuchGroup(String),

    #[error("{child} is not a known host nor group (while adding it to '{parent}')")]
    UnknownMember { parent: String, child: String },

    #[error("adding group '{child}' as child to '{parent}' creates a recursive dependency loop")]
    RecursiveGroup { parent: String, child: String },

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// The four inventory-graph operations an inventory source may call.
///
/// Graph semantics (dedup, implicit groups, precedence) belong to the
/// implementor; sources only issue calls, in order.
pub trait InventorySink {
    fn add_group(&mut self, name: &str) -> Result<(), InventoryError>;

    /// Register `host`, optionally as a member of an existing `group`.
    fn add_host(&mut self, host: &str, group: Option<&str>) -> Result<(), InventoryError>;

    /// Make `child` (a group, or a host) a member of `parent`.
    fn add_child(&mut self, parent: &str, child: &str) -> Result<(), InventoryError>;

    /// Register `host` if needed and merge `vars` into its variables.
    fn set_host_vars(&mut self, host: &str, vars: &Map<String, Value>)
        -> Result<(), InventoryError>;
}
