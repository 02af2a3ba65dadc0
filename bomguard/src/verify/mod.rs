//! The verification pipeline.
//!
//! ```text
//! BOM line ─▶ reconcile ─▶ datasheet ─▶ acquisition ─▶ symbol ─▶ doc checks ─▶ score
//!               │                          │
//!          InventoryStore        AssetLibraryGateway, part lookup, suggestions
//! ```
//!
//! Each stage mutates one [`Component`](crate::model::Component) in place.
//! Expected absences become notes; only invalid records fail a component.

pub mod acquisition;
pub mod health;
pub mod orchestrator;
pub mod reconcile;
pub mod symbol;

pub use acquisition::{AcquisitionOutcome, AssetAcquisitionChain, ChainState};
pub use health::HealthScorer;
pub use orchestrator::{EngineDeps, VerificationOrchestrator};
pub use reconcile::{ComponentReconciler, ReconcileOutcome};
pub use symbol::{check_symbol, symbol_reference};

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::capabilities::CapabilityError;
use crate::model::ValidationError;

/// Failure of one component's processing.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("inventory item {part_id} is invalid: {source}")]
    InventoryRecord {
        part_id: String,
        #[source]
        source: ValidationError,
    },
}

/// Run a capability call under a time limit.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, CapabilityError>
where
    F: Future<Output = Result<T, CapabilityError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CapabilityError::Timeout(limit.as_secs())),
    }
}
