//! Footprint acquisition as an explicit state machine.
//!
//! ```text
//! AssignedCheck ──verified, trusted origin─────────────▶ Done(TrustedSkip)
//!       │ ──pending review from an earlier pass────────▶ Done(ApiPendingReview)
//!       │ ──has MPN──▶ ApiSearch ──downloaded──────────▶ Done(ApiPendingReview)
//!       │                  │ ──usable footprint────────▶ Done(FoundUnverified)
//!       ▼                  ▼
//!   (usable footprint ─▶ Done(FoundUnverified))
//!   SuggestionFallback ──suggestion──▶ Done(SuggestionMade)
//!                      ──otherwise───▶ Done(Unresolved)
//! ```
//!
//! Transitions are sequential and deterministic given the capabilities'
//! answers. Capability failures become notes; nothing here is retried.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::bounded;
use crate::capabilities::snapeda::sanitize_file_name;
use crate::capabilities::{FootprintQuery, PartLookupCapability, SuggestionCapability};
use crate::library::{AssetKind, AssetLibraryGateway};
use crate::model::{Component, FootprintOrigin, FootprintVerification};

pub const PROVENANCE_API_PENDING: &str = "API Download Pending";
pub const PROVENANCE_SUGGESTION: &str = "Suggestion";

/// Terminal result of one pass through the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionOutcome {
    TrustedSkip,
    FoundUnverified,
    ApiPendingReview,
    SuggestionMade,
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    AssignedCheck,
    ApiSearch,
    SuggestionFallback,
    Done(AcquisitionOutcome),
}

pub struct AssetAcquisitionChain {
    library: Arc<dyn AssetLibraryGateway>,
    part_lookup: Arc<dyn PartLookupCapability>,
    suggestions: Arc<dyn SuggestionCapability>,
    review_dir: PathBuf,
    call_timeout: Duration,
}

impl AssetAcquisitionChain {
    pub fn new(
        library: Arc<dyn AssetLibraryGateway>,
        part_lookup: Arc<dyn PartLookupCapability>,
        suggestions: Arc<dyn SuggestionCapability>,
        review_dir: impl Into<PathBuf>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            library,
            part_lookup,
            suggestions,
            review_dir: review_dir.into(),
            call_timeout,
        }
    }

    /// Drive `component` from `AssignedCheck` to a terminal state.
    pub async fn run(&self, component: &mut Component) -> AcquisitionOutcome {
        let mut state = ChainState::AssignedCheck;
        loop {
            tracing::debug!("{}: {:?}", component.reference, state);
            state = match state {
                ChainState::AssignedCheck => self.assigned_check(component),
                ChainState::ApiSearch => self.api_search(component).await,
                ChainState::SuggestionFallback => self.suggestion_fallback(component).await,
                ChainState::Done(outcome) => return outcome,
            };
        }
    }

    fn assigned_check(&self, component: &mut Component) -> ChainState {
        let status = &mut component.status;
        match component.footprint.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            Some(footprint) => {
                let exists = self.library.exists(AssetKind::Footprint, footprint);
                status.footprint_exists = exists;
                if exists {
                    if status.footprint_verified == FootprintVerification::Unknown {
                        status.footprint_verified = FootprintVerification::Unverified;
                    }
                } else {
                    status.footprint_verified = FootprintVerification::Unverified;
                    let note = format!("Footprint '{footprint}' not found in libraries");
                    component.add_note(note);
                }
            }
            None => status.footprint_exists = false,
        }

        let status = &component.status;
        if component.footprint().is_some()
            && status.footprint_verified.is_verified()
            && status.footprint_origin.is_trusted()
        {
            return ChainState::Done(AcquisitionOutcome::TrustedSkip);
        }
        if status.api_downloaded && status.footprint_verified == FootprintVerification::PendingReview {
            return ChainState::Done(AcquisitionOutcome::ApiPendingReview);
        }
        if component.mpn().is_some() {
            ChainState::ApiSearch
        } else {
            Self::found_or_fallback(component)
        }
    }

    async fn api_search(&self, component: &mut Component) -> ChainState {
        let Some(mpn) = component.mpn().map(str::to_string) else {
            return Self::found_or_fallback(component);
        };

        let candidates = match bounded(self.call_timeout, self.part_lookup.search_by_identifier(&mpn)).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("{}: part lookup failed for {}: {}", component.reference, mpn, e);
                component.add_note(format!("Part lookup failed for {mpn}: {e}"));
                return Self::found_or_fallback(component);
            }
        };
        if candidates.is_empty() {
            component.add_note(format!("No part lookup results for {mpn}"));
            return Self::found_or_fallback(component);
        }
        let Some(candidate) = candidates.iter().find(|c| c.has_downloadable_asset) else {
            component.add_note(format!("No downloadable footprint for {mpn}"));
            return Self::found_or_fallback(component);
        };

        let destination = self.review_dir.join(sanitize_file_name(&mpn));
        let download = self
            .part_lookup
            .download(candidate, AssetKind::Footprint, &destination);
        match bounded(self.call_timeout, download).await {
            Ok(path) => {
                let status = &mut component.status;
                status.api_downloaded = true;
                status.footprint_verified = FootprintVerification::PendingReview;
                status.footprint_origin = FootprintOrigin::ApiDownload;
                component.provenance = Some(PROVENANCE_API_PENDING.to_string());
                component.add_note(format!("Footprint downloaded for review: {}", path.display()));
                component.review_asset = Some(path);
                ChainState::Done(AcquisitionOutcome::ApiPendingReview)
            }
            Err(e) => {
                tracing::warn!("{}: footprint download failed for {}: {}", component.reference, mpn, e);
                component.add_note(format!("Footprint download failed for {mpn}: {e}"));
                Self::found_or_fallback(component)
            }
        }
    }

    async fn suggestion_fallback(&self, component: &mut Component) -> ChainState {
        let Some(query) = FootprintQuery::for_component(component) else {
            component.add_note("No footprint resolved and no package to suggest from");
            return ChainState::Done(AcquisitionOutcome::Unresolved);
        };

        match bounded(self.call_timeout, self.suggestions.suggest_footprint(&query)).await {
            Ok(Some(footprint)) => {
                let exists = self.library.exists(AssetKind::Footprint, &footprint);
                let status = &mut component.status;
                status.llm_suggested = true;
                status.footprint_exists = exists;
                status.footprint_verified = FootprintVerification::Unverified;
                status.footprint_origin = FootprintOrigin::Suggestion;
                component.provenance = Some(PROVENANCE_SUGGESTION.to_string());
                component.add_note(format!("Footprint suggested: {footprint} (VERIFY MANUALLY)"));
                if !exists {
                    component.add_note(format!("Suggested footprint '{footprint}' not found in libraries"));
                }
                component.footprint = Some(footprint);
                ChainState::Done(AcquisitionOutcome::SuggestionMade)
            }
            Ok(None) => {
                component.add_note("No footprint suggestion available");
                ChainState::Done(AcquisitionOutcome::Unresolved)
            }
            Err(e) => {
                tracing::warn!("{}: footprint suggestion failed: {}", component.reference, e);
                component.add_note(format!("Footprint suggestion failed: {e}"));
                ChainState::Done(AcquisitionOutcome::Unresolved)
            }
        }
    }

    /// A footprint that exists in the libraries ends the search unverified.
    fn found_or_fallback(component: &Component) -> ChainState {
        if component.footprint().is_some() && component.status.footprint_exists {
            ChainState::Done(AcquisitionOutcome::FoundUnverified)
        } else {
            ChainState::SuggestionFallback
        }
    }
}
