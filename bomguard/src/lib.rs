//! BomGuard - BOM verification and reconciliation engine
//!
//! This library reconciles a bill of materials against a local parts
//! inventory and KiCad footprint/symbol libraries, resolves missing
//! footprints through an ordered fallback chain, and scores how trustworthy
//! each component's data is.
//!
//! # Quick Start
//!
//! ```no_run
//! use bomguard::prelude::*;
//! use bomguard::inventory::{self, load_bom, load_inventory};
//! use bomguard::capabilities::FsDatasheetStore;
//! use bomguard::library::KicadLibraryGateway;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), BomGuardError> {
//! let config = EngineConfig::default();
//! let store = load_inventory(Path::new("inventory.json"), config.inventory.clone())?;
//! let deps = EngineDeps::offline(
//!     inventory::shared(store),
//!     Arc::new(KicadLibraryGateway::new("libs")),
//!     Arc::new(FsDatasheetStore::new(".")),
//! );
//! let orchestrator = VerificationOrchestrator::new(config, deps)?;
//!
//! let mut bom = load_bom(Path::new("bom.json"))?;
//! let report = orchestrator.verify(&mut bom.components, &VerifyOptions::default()).await;
//! println!("{} of {} components need review", report.needs_review, report.components_processed);
//! # Ok(())
//! # }
//! ```
//!
//! # Pipeline
//!
//! - **Reconcile**: match each line against the inventory (MPN first, then value + package)
//! - **Acquire**: check the assigned footprint, then part lookup, then suggestion service
//! - **Symbol**: heuristic symbol lookup from the component value
//! - **Score**: weighted health score from the final status

pub mod capabilities;
pub mod config;
pub mod core;
pub mod inventory;
pub mod library;
pub mod model;
pub mod verify;

// Re-export main types
pub use crate::config::{ConfigError, EngineConfig, HealthRules, HealthWeights};
pub use crate::core::{BomGuardError, VerifyOptions};
pub use crate::inventory::{InventoryStore, SharedInventory};
pub use crate::library::{AssetKind, AssetLibraryGateway, LibraryScope};
pub use crate::model::{
    Component, ComponentStatus, FootprintSource, FootprintVerification, HealthScore,
    InventoryItem, ValidationError, VerificationReport,
};
pub use crate::verify::{EngineDeps, HealthScorer, VerificationOrchestrator, VerifyError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BomGuardError, Component, EngineConfig, EngineDeps, FootprintVerification,
        InventoryItem, InventoryStore, VerificationOrchestrator, VerificationReport,
        VerifyOptions,
    };
}
