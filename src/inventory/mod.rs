pub mod limit;
pub mod render;
pub mod sink;
pub mod types;

pub use sink::{InventoryError, InventorySink};
pub use types::Inventory;
