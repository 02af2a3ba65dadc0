//! Local parts inventory.
//!
//! The store is shared between concurrent verification tasks behind
//! [`SharedInventory`]: many readers during a pass, one writer at a time
//! outside it.

pub mod kicad_export;
pub mod persist;
pub mod store;

pub use kicad_export::{load_kicad_export, parse_kicad_csv, parse_kicad_xml};
pub use persist::{load_bom, load_inventory, save_bom, save_inventory, BomFile, RejectedLine};
pub use store::InventoryStore;

use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedInventory = Arc<RwLock<InventoryStore>>;

pub fn shared(store: InventoryStore) -> SharedInventory {
    Arc::new(RwLock::new(store))
}
