//! Drives every BOM line through the pipeline and builds the report.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::acquisition::AssetAcquisitionChain;
use super::health::HealthScorer;
use super::reconcile::ComponentReconciler;
use super::symbol::check_symbol;
use super::{bounded, VerifyError};
use crate::capabilities::{
    DatasheetStore, DocumentCapability, OfflineDocuments, OfflinePartLookup, OfflineSuggestions,
    PartLookupCapability, SuggestionCapability,
};
use crate::config::EngineConfig;
use crate::core::{BomGuardError, VerifyOptions};
use crate::inventory::{BomFile, InventoryStore, SharedInventory};
use crate::library::AssetLibraryGateway;
use crate::model::{
    Component, ConsistencyVerdict, DocumentCheck, DocumentCheckKind, ValidationError,
    VerificationReport,
};

/// Collaborators a verification run talks to.
#[derive(Clone)]
pub struct EngineDeps {
    pub inventory: SharedInventory,
    pub library: Arc<dyn AssetLibraryGateway>,
    pub part_lookup: Arc<dyn PartLookupCapability>,
    pub suggestions: Arc<dyn SuggestionCapability>,
    pub documents: Arc<dyn DocumentCapability>,
    pub datasheets: Arc<dyn DatasheetStore>,
}

impl EngineDeps {
    /// Local-only collaborators: inventory, libraries and datasheets on disk.
    pub fn offline(
        inventory: SharedInventory,
        library: Arc<dyn AssetLibraryGateway>,
        datasheets: Arc<dyn DatasheetStore>,
    ) -> Self {
        Self {
            inventory,
            library,
            part_lookup: Arc::new(OfflinePartLookup),
            suggestions: Arc::new(OfflineSuggestions),
            documents: Arc::new(OfflineDocuments),
            datasheets,
        }
    }
}

pub struct VerificationOrchestrator {
    config: EngineConfig,
    deps: EngineDeps,
    chain: AssetAcquisitionChain,
    scorer: HealthScorer,
    call_timeout: Duration,
}

impl VerificationOrchestrator {
    /// Fails before any processing if the configuration is unusable.
    pub fn new(config: EngineConfig, deps: EngineDeps) -> Result<Self, BomGuardError> {
        config.validate()?;
        let call_timeout = Duration::from_secs(config.acquisition.capability_timeout_secs);
        let chain = AssetAcquisitionChain::new(
            Arc::clone(&deps.library),
            Arc::clone(&deps.part_lookup),
            Arc::clone(&deps.suggestions),
            config.acquisition.review_dir.clone(),
            call_timeout,
        );
        let scorer = HealthScorer::new(config.health.clone());
        Ok(Self {
            config,
            deps,
            chain,
            scorer,
            call_timeout,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scorer(&self) -> &HealthScorer {
        &self.scorer
    }

    /// Verify every line of `bom` in place.
    pub async fn verify(&self, bom: &mut [Component], options: &VerifyOptions) -> VerificationReport {
        self.run(bom, options, None).await
    }

    /// Verify a loaded BOM file in place.
    ///
    /// Lines rejected at load are reported as failed components after the
    /// decoded ones.
    pub async fn verify_bom(&self, bom: &mut BomFile, options: &VerifyOptions) -> VerificationReport {
        let mut report = self.run(&mut bom.components, options, None).await;
        for line in &bom.rejected {
            tracing::warn!("{}: rejected at load: {}", line.reference, line.error);
            report.reject(&line.reference, &format!("invalid BOM line: {}", line.error));
        }
        report
    }

    /// Like [`verify`](Self::verify), stopping when `cancel` turns `true`.
    ///
    /// Lines finished before cancellation keep their new state; the rest are
    /// left exactly as they were.
    pub async fn verify_cancellable(
        &self,
        bom: &mut [Component],
        options: &VerifyOptions,
        cancel: watch::Receiver<bool>,
    ) -> VerificationReport {
        self.run(bom, options, Some(cancel)).await
    }

    async fn run(
        &self,
        bom: &mut [Component],
        options: &VerifyOptions,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> VerificationReport {
        let mut report = VerificationReport::begin();
        let inventory = self.deps.inventory.read().await;
        report.inventory_errors = inventory.load_errors().to_vec();
        let concurrency = options
            .concurrency
            .unwrap_or(self.config.acquisition.concurrency)
            .max(1);

        let mut seen = HashSet::new();
        let work: Vec<(usize, Component, bool)> = bom
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.clone(), !seen.insert(c.reference.trim().to_string())))
            .collect();

        tracing::info!("Verifying {} BOM lines (concurrency {})", work.len(), concurrency);

        let inventory_ref: &InventoryStore = &inventory;
        let mut results = stream::iter(work.into_iter().map(|(index, component, duplicate)| async move {
            let original = component.clone();
            match self.process(component, inventory_ref, duplicate, options).await {
                Ok(updated) => (index, updated, None),
                Err(e) => {
                    tracing::warn!("{}: {}", original.reference, e);
                    let mut kept = original;
                    kept.notes = vec![format!("Verification failed: {e}")];
                    let error = format!("{}: {}", kept.reference, e);
                    (index, kept, Some(error))
                }
            }
        }))
        .buffered(concurrency);

        let mut processed = Vec::new();
        loop {
            let next = match cancel.as_mut() {
                Some(rx) => tokio::select! {
                    biased;
                    _ = wait_for_cancel(rx) => {
                        report.cancelled = true;
                        break;
                    }
                    item = results.next() => item,
                },
                None => results.next().await,
            };
            let Some((index, component, error)) = next else {
                break;
            };
            bom[index] = component;
            processed.push((index, error));
        }
        drop(results);
        drop(inventory);

        for (index, error) in processed {
            let component = &bom[index];
            let failed = error.is_some();
            report.tally(component, failed || self.scorer.needs_review(component));
            if let Some(error) = error {
                report.errors.push(error);
            }
        }
        report.finish();

        tracing::info!(
            "Verified {} components: {} need review, {} errors{}",
            report.components_processed,
            report.needs_review,
            report.errors.len(),
            if report.cancelled { " (cancelled)" } else { "" }
        );
        report
    }

    async fn process(
        &self,
        mut component: Component,
        inventory: &InventoryStore,
        duplicate: bool,
        options: &VerifyOptions,
    ) -> Result<Component, VerifyError> {
        component.clear_notes();
        if duplicate {
            return Err(ValidationError::DuplicateReference(component.reference.clone()).into());
        }
        component.validate()?;
        component.revoke_untrusted_verification();

        ComponentReconciler::reconcile(&mut component, inventory)?;
        self.check_datasheet(&mut component, options).await;

        let outcome = self.chain.run(&mut component).await;
        tracing::debug!("{}: acquisition ended in {:?}", component.reference, outcome);

        check_symbol(
            &mut component,
            self.deps.library.as_ref(),
            &self.config.acquisition.symbol_library,
        );
        if options.check_documents {
            self.check_documents(&mut component).await;
        }

        component.health = self.scorer.score(&component);
        Ok(component)
    }

    async fn check_datasheet(&self, component: &mut Component, options: &VerifyOptions) {
        let store = self.deps.datasheets.as_ref();
        if let Some(path) = store.local_path(component) {
            component.datasheet_local = Some(path);
            component.status.datasheet_local = true;
            return;
        }
        component.status.datasheet_local = false;

        if component.datasheet_url().is_none() {
            component.add_note("No datasheet (no local copy, no URL)");
            return;
        }
        if !options.download_datasheets {
            component.add_note("Datasheet not stored locally");
            return;
        }

        match bounded(self.call_timeout, store.download(component)).await {
            Ok(true) => match store.local_path(component) {
                Some(path) => {
                    component.datasheet_local = Some(path);
                    component.status.datasheet_local = true;
                }
                None => component.add_note("Datasheet downloaded but not found locally"),
            },
            Ok(false) => component.add_note("Datasheet not stored locally"),
            Err(e) => {
                tracing::warn!("{}: datasheet download failed: {}", component.reference, e);
                component.add_note(format!("Datasheet download failed: {e}"));
            }
        }
    }

    async fn check_documents(&self, component: &mut Component) {
        let text = match bounded(self.call_timeout, self.deps.datasheets.extract_text(component)).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                component.add_note("Doc checks skipped: no datasheet text");
                return;
            }
            Err(e) => {
                component.add_note(format!("Doc checks skipped: {e}"));
                return;
            }
        };

        component.status.doc_checks.clear();
        for kind in [DocumentCheckKind::PinCount, DocumentCheckKind::Package] {
            let documents = self.deps.documents.as_ref();
            let result = match kind {
                DocumentCheckKind::PinCount => {
                    bounded(self.call_timeout, documents.check_pin_count_consistency(&text, component)).await
                }
                DocumentCheckKind::Package => {
                    bounded(self.call_timeout, documents.check_package_consistency(&text, component)).await
                }
            };
            match result {
                Ok(result) => {
                    if result.verdict == ConsistencyVerdict::Mismatch {
                        component.add_note(format!("Datasheet {kind:?} mismatch: {}", result.notes));
                    }
                    component.status.doc_checks.push(DocumentCheck { kind, result });
                }
                Err(e) => {
                    tracing::warn!("{}: {:?} check failed: {}", component.reference, kind, e);
                    component.add_note(format!("{kind:?} check failed: {e}"));
                }
            }
        }
    }
}

async fn wait_for_cancel(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone without cancelling: never fires.
            std::future::pending::<()>().await;
        }
    }
}
