//! Shared fakes for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bomguard::capabilities::{
    CapabilityError, DatasheetStore, DocumentCapability, FootprintQuery, PartCandidate,
    PartLookupCapability, SuggestionCapability,
};
use bomguard::library::AssetKind;
use bomguard::model::{Component, ConsistencyResult, ConsistencyVerdict};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Scripted part lookup that records every MPN it is asked about.
#[derive(Default)]
pub struct RecordingLookup {
    pub searched: Mutex<Vec<String>>,
    pub downloads: AtomicUsize,
    failing: Vec<String>,
    downloadable: Vec<String>,
    delay: Option<Duration>,
}

impl RecordingLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, mpn: &str) -> Self {
        self.failing.push(mpn.to_string());
        self
    }

    pub fn downloadable(mut self, mpn: &str) -> Self {
        self.downloadable.push(mpn.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn search_count(&self) -> usize {
        self.searched.lock().unwrap().len()
    }
}

#[async_trait]
impl PartLookupCapability for RecordingLookup {
    fn name(&self) -> &str {
        "recording"
    }

    async fn search_by_identifier(&self, mpn: &str) -> Result<Vec<PartCandidate>, CapabilityError> {
        self.searched.lock().unwrap().push(mpn.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.iter().any(|m| m == mpn) {
            return Err(CapabilityError::ApiError {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        if self.downloadable.iter().any(|m| m == mpn) {
            return Ok(vec![PartCandidate {
                identifier: mpn.to_string(),
                has_downloadable_asset: true,
                download_ref: Some(format!("id-{mpn}")),
            }]);
        }
        Ok(Vec::new())
    }

    async fn download(
        &self,
        candidate: &PartCandidate,
        kind: AssetKind,
        destination: &Path,
    ) -> Result<PathBuf, CapabilityError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        tokio::fs::create_dir_all(destination).await?;
        let file = destination.join(format!("{}.{}", candidate.identifier, kind.file_extension()));
        tokio::fs::write(&file, "(footprint \"downloaded\")").await?;
        Ok(file)
    }
}

/// Suggestion service answering from a fixed package table.
#[derive(Default)]
pub struct RecordingSuggestions {
    pub queries: Mutex<Vec<FootprintQuery>>,
    answers: HashMap<String, String>,
}

impl RecordingSuggestions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, package: &str, footprint: &str) -> Self {
        self.answers.insert(package.to_string(), footprint.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl SuggestionCapability for RecordingSuggestions {
    fn name(&self) -> &str {
        "recording"
    }

    async fn suggest_footprint(&self, query: &FootprintQuery) -> Result<Option<String>, CapabilityError> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.answers.get(&query.package).cloned())
    }
}

/// Datasheet store with no local copies and no network.
pub struct NoDatasheets;

#[async_trait]
impl DatasheetStore for NoDatasheets {
    fn local_path(&self, _component: &Component) -> Option<String> {
        None
    }

    async fn download(&self, _component: &Component) -> Result<bool, CapabilityError> {
        Ok(false)
    }

    async fn extract_text(&self, _component: &Component) -> Result<Option<String>, CapabilityError> {
        Ok(None)
    }
}

/// Datasheet store that "downloads" by remembering the reference.
#[derive(Default)]
pub struct RecordingDatasheets {
    pub stored: Mutex<HashSet<String>>,
    pub downloads: AtomicUsize,
    text: Option<String>,
    failing: bool,
}

impl RecordingDatasheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn preloaded(self, reference: &str) -> Self {
        self.stored.lock().unwrap().insert(reference.to_string());
        self
    }
}

#[async_trait]
impl DatasheetStore for RecordingDatasheets {
    fn local_path(&self, component: &Component) -> Option<String> {
        self.stored
            .lock()
            .unwrap()
            .contains(&component.reference)
            .then(|| format!("datasheets/{}.pdf", component.reference))
    }

    async fn download(&self, component: &Component) -> Result<bool, CapabilityError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(CapabilityError::ApiError {
                status: 404,
                message: "not found".to_string(),
            });
        }
        self.stored.lock().unwrap().insert(component.reference.clone());
        Ok(true)
    }

    async fn extract_text(&self, component: &Component) -> Result<Option<String>, CapabilityError> {
        Ok(self.local_path(component).and(self.text.clone()))
    }
}

/// Document checker with a fixed pin-count verdict and a failing package check.
pub struct ScriptedDocuments {
    pub pin_count: ConsistencyVerdict,
    pub calls: AtomicUsize,
}

impl ScriptedDocuments {
    pub fn new(pin_count: ConsistencyVerdict) -> Self {
        Self {
            pin_count,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DocumentCapability for ScriptedDocuments {
    async fn check_pin_count_consistency(
        &self,
        _text: &str,
        _component: &Component,
    ) -> Result<ConsistencyResult, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ConsistencyResult {
            verdict: self.pin_count,
            notes: "datasheet shows 14 pins".to_string(),
        })
    }

    async fn check_package_consistency(
        &self,
        _text: &str,
        _component: &Component,
    ) -> Result<ConsistencyResult, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CapabilityError::Unavailable("package checker".to_string()))
    }
}
