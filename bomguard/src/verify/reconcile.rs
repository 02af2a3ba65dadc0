//! Merge a BOM line with its inventory match.

use crate::inventory::InventoryStore;
use crate::model::{loose_eq, Component, FootprintOrigin, FootprintVerification};

use super::VerifyError;

pub const PROVENANCE_BOM: &str = "BOM Defined";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Matched { part_id: String },
    Unmatched,
}

pub struct ComponentReconciler;

impl ComponentReconciler {
    /// Apply the best inventory match to `component`. Never mutates the store.
    ///
    /// A matched item's footprint is adopted only when the line has none. The
    /// footprint is marked verified only for trusted inventory provenance; a
    /// BOM footprint that disagrees with the inventory stays unverified. A
    /// footprint a reviewer verified from a trusted source is left alone.
    pub fn reconcile(
        component: &mut Component,
        store: &InventoryStore,
    ) -> Result<ReconcileOutcome, VerifyError> {
        let Some(item) = store.find_match(component) else {
            if component.provenance.as_deref().map_or(true, |p| p.trim().is_empty()) {
                component.provenance = Some(PROVENANCE_BOM.to_string());
            }
            if component.footprint().is_some()
                && component.status.footprint_origin == FootprintOrigin::Unassigned
            {
                component.status.footprint_origin = FootprintOrigin::Bom;
            }
            return Ok(ReconcileOutcome::Unmatched);
        };

        item.validate().map_err(|source| VerifyError::InventoryRecord {
            part_id: item.part_id.clone(),
            source,
        })?;

        tracing::debug!("{} matched inventory {}", component.reference, item.part_id);
        component.provenance = Some(format!("Inventory Match: {}", item.part_id));

        let agrees = match component.footprint() {
            None => {
                component.footprint = Some(item.footprint.clone());
                true
            }
            Some(existing) => loose_eq(existing, &item.footprint),
        };

        let reviewed = matches!(component.status.footprint_origin, FootprintOrigin::Reviewed { .. })
            && component.status.footprint_origin.is_trusted()
            && component.status.footprint_verified.is_verified();

        if !agrees {
            component.add_note(format!(
                "BOM footprint differs from inventory {} ({})",
                item.part_id, item.footprint
            ));
        }

        if reviewed {
            tracing::debug!("{} keeps its reviewed footprint", component.reference);
        } else if agrees {
            component.status.footprint_origin = FootprintOrigin::Inventory {
                part_id: item.part_id.clone(),
                source: item.footprint_source,
                ai_identified: item.analysis_confidence.is_ai_identified(),
            };
            component.status.footprint_verified = if item.footprint_source.is_trusted() {
                FootprintVerification::Verified
            } else {
                FootprintVerification::Unverified
            };
        } else {
            component.status.footprint_verified = FootprintVerification::Unverified;
        }

        if component.mpn().is_none() {
            if let Some(mpn) = item.mpn() {
                component.mpn = Some(mpn.to_string());
            }
        }
        if component.datasheet_local.is_none() {
            component.datasheet_local = item.datasheet_local.clone();
        }

        Ok(ReconcileOutcome::Matched {
            part_id: item.part_id.clone(),
        })
    }
}
