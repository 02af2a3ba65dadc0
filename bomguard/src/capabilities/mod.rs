//! External capabilities the engine consumes.
//!
//! Network services and document stores sit behind these traits so the
//! verification stages never depend on a concrete client. Every call may fail
//! with a [`CapabilityError`]; callers turn failures into diagnostic notes.

pub mod datasheets;
pub mod offline;
pub mod ollama;
pub mod prompts;
pub mod snapeda;

pub use datasheets::FsDatasheetStore;
pub use offline::{OfflineDocuments, OfflinePartLookup, OfflineSuggestions};
pub use ollama::OllamaClient;
pub use snapeda::SnapEdaClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::library::AssetKind;
use crate::model::{Component, ConsistencyResult};

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("service error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("timed out after {0}s")]
    Timeout(u64),
    #[error("{0} is not available")]
    Unavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One search hit from a part lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartCandidate {
    pub identifier: String,
    pub has_downloadable_asset: bool,
    /// Opaque service reference used to fetch the asset.
    pub download_ref: Option<String>,
}

/// What the suggestion service is told about a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintQuery {
    pub description: String,
    pub package: String,
    pub value: String,
}

impl FootprintQuery {
    pub fn for_component(component: &Component) -> Option<Self> {
        Some(Self {
            description: component.description.trim().to_string(),
            package: component.package()?.to_string(),
            value: component.value.trim().to_string(),
        })
    }
}

#[async_trait]
pub trait PartLookupCapability: Send + Sync {
    fn name(&self) -> &str;

    /// Candidates for an MPN, in the service's own relevance order.
    async fn search_by_identifier(&self, mpn: &str) -> Result<Vec<PartCandidate>, CapabilityError>;

    /// Fetch one asset into `destination`, returning the written file.
    async fn download(
        &self,
        candidate: &PartCandidate,
        kind: AssetKind,
        destination: &Path,
    ) -> Result<PathBuf, CapabilityError>;
}

#[async_trait]
pub trait SuggestionCapability: Send + Sync {
    fn name(&self) -> &str;

    /// A `Library:Name` footprint, or `None` when the service has no answer.
    async fn suggest_footprint(&self, query: &FootprintQuery) -> Result<Option<String>, CapabilityError>;
}

#[async_trait]
pub trait DocumentCapability: Send + Sync {
    async fn check_pin_count_consistency(
        &self,
        text: &str,
        component: &Component,
    ) -> Result<ConsistencyResult, CapabilityError>;

    async fn check_package_consistency(
        &self,
        text: &str,
        component: &Component,
    ) -> Result<ConsistencyResult, CapabilityError>;
}

#[async_trait]
pub trait DatasheetStore: Send + Sync {
    /// Project-relative path of an existing local copy.
    fn local_path(&self, component: &Component) -> Option<String>;

    fn has_local(&self, component: &Component) -> bool {
        self.local_path(component).is_some()
    }

    /// Fetch the datasheet from its URL. `Ok(false)` when there is nothing to fetch.
    async fn download(&self, component: &Component) -> Result<bool, CapabilityError>;

    async fn extract_text(&self, component: &Component) -> Result<Option<String>, CapabilityError>;
}
