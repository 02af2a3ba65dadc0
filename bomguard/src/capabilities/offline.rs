//! Stand-ins used when a network service is disabled or not configured.
//!
//! Each one answers with [`CapabilityError::Unavailable`], which the pipeline
//! records as a diagnostic like any other service failure.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{
    CapabilityError, DocumentCapability, FootprintQuery, PartCandidate, PartLookupCapability,
    SuggestionCapability,
};
use crate::library::AssetKind;
use crate::model::{Component, ConsistencyResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflinePartLookup;

#[async_trait]
impl PartLookupCapability for OfflinePartLookup {
    fn name(&self) -> &str {
        "offline"
    }

    async fn search_by_identifier(&self, _mpn: &str) -> Result<Vec<PartCandidate>, CapabilityError> {
        Err(CapabilityError::Unavailable("part lookup".to_string()))
    }

    async fn download(
        &self,
        _candidate: &PartCandidate,
        _kind: AssetKind,
        _destination: &Path,
    ) -> Result<PathBuf, CapabilityError> {
        Err(CapabilityError::Unavailable("part lookup".to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSuggestions;

#[async_trait]
impl SuggestionCapability for OfflineSuggestions {
    fn name(&self) -> &str {
        "offline"
    }

    async fn suggest_footprint(&self, _query: &FootprintQuery) -> Result<Option<String>, CapabilityError> {
        Err(CapabilityError::Unavailable("suggestion service".to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineDocuments;

#[async_trait]
impl DocumentCapability for OfflineDocuments {
    async fn check_pin_count_consistency(
        &self,
        _text: &str,
        _component: &Component,
    ) -> Result<ConsistencyResult, CapabilityError> {
        Err(CapabilityError::Unavailable("document checks".to_string()))
    }

    async fn check_package_consistency(
        &self,
        _text: &str,
        _component: &Component,
    ) -> Result<ConsistencyResult, CapabilityError> {
        Err(CapabilityError::Unavailable("document checks".to_string()))
    }
}
