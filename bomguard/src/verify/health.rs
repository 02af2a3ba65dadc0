//! Weighted health score per component.

use crate::config::HealthRules;
use crate::model::{
    Component, ConsistencyVerdict, FootprintOrigin, FootprintSource, FootprintVerification,
    HealthScore, SymbolStatus,
};

/// Scores components against a fixed rule set.
///
/// Scoring is pure: the same component and rules always give the same score
/// and detail lines.
#[derive(Debug, Clone)]
pub struct HealthScorer {
    rules: HealthRules,
    max: f64,
}

impl HealthScorer {
    pub fn new(rules: HealthRules) -> Self {
        let p = &rules.points;
        let max = p.datasheet_local.max(p.datasheet_url)
            + p.max_footprint()
            + p.symbol_project_lib.max(p.symbol_standard_lib)
            + p.mpn_exists;
        Self {
            rules,
            max: round2(max),
        }
    }

    pub fn max_score(&self) -> f64 {
        self.max
    }

    pub fn rules(&self) -> &HealthRules {
        &self.rules
    }

    pub fn score(&self, component: &Component) -> HealthScore {
        let p = &self.rules.points;
        let status = &component.status;
        let mut value = 0.0;
        let mut details = Vec::new();
        let mut award = |points: f64, label: &str, details: &mut Vec<String>| {
            value += points;
            details.push(format!("[+{points:.1}] {label}"));
        };

        if status.datasheet_local {
            award(p.datasheet_local, "Datasheet Local", &mut details);
        } else if component.datasheet_url().is_some() {
            award(p.datasheet_url, "Datasheet URL Only", &mut details);
        } else {
            details.push("[FAIL] Datasheet Missing".to_string());
        }

        match self.footprint_weight(component) {
            Some((points, label)) => award(points, label, &mut details),
            None if component.footprint().is_some() => {
                details.push("[FAIL] Footprint Not Found".to_string())
            }
            None => details.push("[FAIL] Footprint Missing".to_string()),
        }

        match status.symbol {
            SymbolStatus::ProjectLibrary => award(p.symbol_project_lib, "Symbol Project Library", &mut details),
            SymbolStatus::StandardLibrary => award(p.symbol_standard_lib, "Symbol Standard Library", &mut details),
            SymbolStatus::Missing => details.push("[FAIL] Symbol Missing".to_string()),
        }

        if component.mpn().is_some() {
            award(p.mpn_exists, "MPN Provided", &mut details);
        } else {
            details.push("[INFO] MPN Missing".to_string());
        }

        for check in &status.doc_checks {
            let verdict = match check.result.verdict {
                ConsistencyVerdict::Match => "match",
                ConsistencyVerdict::Mismatch => "mismatch",
                ConsistencyVerdict::Unknown => "unknown",
            };
            details.push(format!("[INFO] Doc Check {:?}: {}", check.kind, verdict));
        }

        HealthScore {
            value: round2(value.max(0.0)),
            max: self.max,
            details,
            rules_version: Some(self.rules.version.clone()),
        }
    }

    /// Exactly one footprint weight applies, picked by the most specific state.
    fn footprint_weight(&self, component: &Component) -> Option<(f64, &'static str)> {
        let p = &self.rules.points;
        let status = &component.status;

        if status.footprint_verified == FootprintVerification::PendingReview {
            return Some((p.footprint_api_review, "Footprint Review Pending (API)"));
        }
        component.footprint()?;

        if status.footprint_verified.is_verified() && status.footprint_origin.is_trusted() {
            return Some(match status.footprint_origin {
                FootprintOrigin::Inventory { .. } => (p.footprint_inventory, "Footprint Verified (Inventory)"),
                _ => (p.footprint_project_manual, "Footprint Verified (Project/Manual)"),
            });
        }

        match &status.footprint_origin {
            FootprintOrigin::Reviewed { source: FootprintSource::ApiVerified } => {
                Some((p.footprint_api_verified, "Footprint API Verified"))
            }
            FootprintOrigin::Inventory { source: FootprintSource::ApiVerified, .. } => {
                Some((p.footprint_inventory_api, "Footprint Inventory API-Sourced (Verify!)"))
            }
            FootprintOrigin::Inventory { ai_identified: true, .. } => {
                Some((p.footprint_inventory_suggestion, "Footprint Inventory AI-Identified (Verify!)"))
            }
            _ if status.llm_suggested || status.footprint_origin == FootprintOrigin::Suggestion => {
                Some((p.footprint_suggestion, "Footprint Suggested (Verify!)"))
            }
            _ if status.footprint_exists => Some((p.footprint_standard_lib, "Footprint Found Lib (Verify!)")),
            _ => None,
        }
    }

    /// Flag for human review: low score, unverified footprint.
    pub fn needs_review(&self, component: &Component) -> bool {
        component.health.value < self.rules.thresholds.needs_review_below
            || !component.status.footprint_verified.is_verified()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
