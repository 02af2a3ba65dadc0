//! Summary of one verification run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::component::{Component, FootprintVerification};

/// Counters and errors for a verification run.
///
/// Counters are derived from each component's final status once the run is
/// over, never accumulated while stages execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub components_processed: usize,
    pub needs_review: usize,
    pub missing_footprint: usize,
    pub missing_symbol: usize,
    pub missing_datasheet: usize,
    pub pending_api_downloads: usize,
    pub suggestions_made: usize,
    /// `"<ref>: <message>"` for every component whose processing failed.
    pub errors: Vec<String>,
    /// References flagged for human review, in BOM order.
    pub review_refs: Vec<String>,
    /// Inventory records that could not be loaded for this run.
    #[serde(default)]
    pub inventory_errors: Vec<String>,
    /// Set when the run was stopped before every component was processed.
    pub cancelled: bool,
}

impl VerificationReport {
    pub(crate) fn begin() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            components_processed: 0,
            needs_review: 0,
            missing_footprint: 0,
            missing_symbol: 0,
            missing_datasheet: 0,
            pending_api_downloads: 0,
            suggestions_made: 0,
            errors: Vec::new(),
            review_refs: Vec::new(),
            inventory_errors: Vec::new(),
            cancelled: false,
        }
    }

    /// Fold one processed component's final state into the counters.
    pub(crate) fn tally(&mut self, component: &Component, needs_review: bool) {
        let status = &component.status;
        self.components_processed += 1;
        if needs_review {
            self.needs_review += 1;
            self.review_refs.push(component.reference.clone());
        }
        if component.footprint().is_none() || !status.footprint_exists {
            self.missing_footprint += 1;
        }
        if !status.symbol.exists() {
            self.missing_symbol += 1;
        }
        if !status.datasheet_local {
            self.missing_datasheet += 1;
        }
        if status.api_downloaded
            && status.footprint_verified == FootprintVerification::PendingReview
        {
            self.pending_api_downloads += 1;
        }
        if status.llm_suggested {
            self.suggestions_made += 1;
        }
    }

    /// Count a BOM line that never decoded as a failed component.
    ///
    /// Its asset counters are left alone since nothing is known about it.
    pub(crate) fn reject(&mut self, reference: &str, error: &str) {
        self.components_processed += 1;
        self.needs_review += 1;
        self.review_refs.push(reference.to_string());
        self.errors.push(format!("{reference}: {error}"));
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || !self.inventory_errors.is_empty()
    }

    pub fn has_review_items(&self) -> bool {
        self.needs_review > 0
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
