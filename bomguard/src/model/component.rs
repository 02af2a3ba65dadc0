//! BOM line records and their verification status.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::inventory_item::FootprintSource;
use super::{non_blank, validate_relative_path, ValidationError};

/// Human verification state of the assigned footprint.
///
/// `PendingReview` is distinct from `Unverified`: an asset was acquired and is
/// waiting for a reviewer, as opposed to simply not being trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootprintVerification {
    #[default]
    Unknown,
    Unverified,
    Verified,
    PendingReview,
}

impl FootprintVerification {
    pub fn is_verified(&self) -> bool {
        matches!(self, FootprintVerification::Verified)
    }
}

/// Where the currently assigned footprint came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FootprintOrigin {
    #[default]
    Unassigned,
    /// Assigned in the BOM export itself.
    Bom,
    /// Inherited from a matched inventory record.
    Inventory {
        part_id: String,
        source: FootprintSource,
        #[serde(default)]
        ai_identified: bool,
    },
    /// Downloaded from the part lookup service into the review area.
    ApiDownload,
    /// Proposed by the suggestion service.
    Suggestion,
    /// Decided by a human reviewer.
    Reviewed { source: FootprintSource },
}

impl FootprintOrigin {
    /// Whether this origin may back a `Verified` footprint.
    pub fn is_trusted(&self) -> bool {
        match self {
            FootprintOrigin::Inventory { source, .. } | FootprintOrigin::Reviewed { source } => {
                source.is_trusted()
            }
            _ => false,
        }
    }
}

/// Heuristic symbol lookup result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolStatus {
    #[default]
    Missing,
    ProjectLibrary,
    StandardLibrary,
}

impl SymbolStatus {
    pub fn exists(&self) -> bool {
        !matches!(self, SymbolStatus::Missing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyVerdict {
    Match,
    Mismatch,
    Unknown,
}

/// Answer from a documentation consistency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyResult {
    pub verdict: ConsistencyVerdict,
    #[serde(default)]
    pub notes: String,
}

impl ConsistencyResult {
    pub fn unknown(notes: impl Into<String>) -> Self {
        Self {
            verdict: ConsistencyVerdict::Unknown,
            notes: notes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCheckKind {
    PinCount,
    Package,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCheck {
    pub kind: DocumentCheckKind,
    pub result: ConsistencyResult,
}

/// Verification flags for one component.
///
/// Persists across passes and is refined rather than reset, so a
/// reviewer's earlier decisions survive re-verification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentStatus {
    pub footprint_exists: bool,
    pub api_downloaded: bool,
    pub llm_suggested: bool,
    pub footprint_verified: FootprintVerification,
    pub footprint_origin: FootprintOrigin,
    pub symbol: SymbolStatus,
    pub datasheet_local: bool,
    pub doc_checks: Vec<DocumentCheck>,
}

/// Weighted health of a component's data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthScore {
    pub value: f64,
    pub max: f64,
    pub details: Vec<String>,
    pub rules_version: Option<String>,
}

impl HealthScore {
    /// Score as a fraction of the attainable maximum.
    pub fn ratio(&self) -> f64 {
        if self.max > 0.0 {
            self.value / self.max
        } else {
            0.0
        }
    }
}

/// One BOM line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(alias = "ref")]
    pub reference: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub footprint: Option<String>,
    #[serde(default)]
    pub mpn: Option<String>,
    #[serde(default)]
    pub datasheet_url: Option<String>,
    /// Project-relative path of the local datasheet copy.
    #[serde(default)]
    pub datasheet_local: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub status: ComponentStatus,
    #[serde(default)]
    pub health: HealthScore,
    /// Free-form provenance note ("BOM Defined", "Inventory Match: INV001", ...).
    #[serde(default)]
    pub provenance: Option<String>,
    /// Diagnostics from the latest pass, in the order they were first raised.
    /// A note repeated within one pass is kept once.
    #[serde(default)]
    pub notes: Vec<String>,
    /// Asset downloaded for review, if any.
    #[serde(default)]
    pub review_asset: Option<PathBuf>,
}

fn default_quantity() -> u32 {
    1
}

impl Component {
    pub fn new(reference: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            value: value.into(),
            description: String::new(),
            package: None,
            footprint: None,
            mpn: None,
            datasheet_url: None,
            datasheet_local: None,
            quantity: 1,
            status: ComponentStatus::default(),
            health: HealthScore::default(),
            provenance: None,
            notes: Vec::new(),
            review_asset: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_footprint(mut self, footprint: impl Into<String>) -> Self {
        self.footprint = Some(footprint.into());
        self.status.footprint_origin = FootprintOrigin::Bom;
        self
    }

    pub fn with_mpn(mut self, mpn: impl Into<String>) -> Self {
        self.mpn = Some(mpn.into());
        self
    }

    pub fn with_datasheet_url(mut self, url: impl Into<String>) -> Self {
        self.datasheet_url = Some(url.into());
        self
    }

    pub fn mpn(&self) -> Option<&str> {
        non_blank(self.mpn.as_deref())
    }

    pub fn package(&self) -> Option<&str> {
        non_blank(self.package.as_deref())
    }

    pub fn footprint(&self) -> Option<&str> {
        non_blank(self.footprint.as_deref())
    }

    pub fn datasheet_url(&self) -> Option<&str> {
        non_blank(self.datasheet_url.as_deref())
    }

    /// Append a diagnostic note.
    ///
    /// Stages that revisit the same condition (a retried lookup, a re-run
    /// check) may raise identical text; exact duplicates are kept once so
    /// `notes` lists each distinct diagnostic in first-raised order.
    pub fn add_note(&mut self, note: impl Into<String>) {
        let note = note.into();
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
    }

    pub fn clear_notes(&mut self) {
        self.notes.clear();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reference.trim().is_empty() {
            return Err(ValidationError::EmptyReference);
        }
        if let Some(path) = self.datasheet_local.as_deref() {
            validate_relative_path("datasheet_local", path)?;
        }
        Ok(())
    }

    /// Record a reviewer's decision about the assigned footprint.
    ///
    /// Only trusted provenances produce `Verified`; anything else leaves the
    /// footprint `Unverified`.
    pub fn confirm_footprint(&mut self, source: FootprintSource) {
        self.status.footprint_verified = if source.is_trusted() {
            FootprintVerification::Verified
        } else {
            FootprintVerification::Unverified
        };
        self.status.footprint_origin = FootprintOrigin::Reviewed { source };
        self.status.llm_suggested = false;
    }

    /// Downgrade a loaded `Verified` state whose origin is not trusted.
    ///
    /// Returns `true` if the verification was revoked.
    pub fn revoke_untrusted_verification(&mut self) -> bool {
        if !self.status.footprint_verified.is_verified() || self.status.footprint_origin.is_trusted() {
            return false;
        }
        tracing::warn!(
            "{}: verified footprint has untrusted origin {:?}",
            self.reference,
            self.status.footprint_origin
        );
        self.status.footprint_verified = FootprintVerification::Unverified;
        self.add_note("Verification revoked: footprint origin is not trusted");
        true
    }
}
