//! Data model shared by the inventory, the verification stages and the CLI.
//!
//! Every record here is plain serde data. Verification stages mutate
//! [`Component`] in place; [`InventoryItem`] is owned by the inventory store.

pub mod component;
pub mod inventory_item;
pub mod report;

pub use component::{
    Component, ComponentStatus, ConsistencyResult, ConsistencyVerdict, DocumentCheck,
    DocumentCheckKind, FootprintOrigin, FootprintVerification, HealthScore, SymbolStatus,
};
pub use inventory_item::{AnalysisConfidence, FootprintSource, InventoryItem, MountingType};
pub use report::VerificationReport;

use std::path::{Component as PathComponent, Path};
use thiserror::Error;

/// Structural problems with a single record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("component reference cannot be empty")]
    EmptyReference,
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
    #[error("footprint '{0}' must be in Library:Name format")]
    FootprintFormat(String),
    #[error("{field} must be relative to the project root: {path}")]
    AbsolutePath { field: &'static str, path: String },
    #[error("{field} cannot contain '..': {path}")]
    ParentTraversal { field: &'static str, path: String },
    #[error("duplicate reference designator '{0}'")]
    DuplicateReference(String),
    #[error("duplicate inventory part id '{0}'")]
    DuplicatePartId(String),
}

/// Check that a stored path is project-relative and stays inside the project.
pub(crate) fn validate_relative_path(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let path = Path::new(value);
    if path.is_absolute() || value.starts_with('/') || value.starts_with('\\') {
        return Err(ValidationError::AbsolutePath {
            field,
            path: value.to_string(),
        });
    }
    if path.components().any(|c| matches!(c, PathComponent::ParentDir)) {
        return Err(ValidationError::ParentTraversal {
            field,
            path: value.to_string(),
        });
    }
    Ok(())
}

/// Case-insensitive, whitespace-trimmed equality used by inventory matching.
pub(crate) fn loose_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}

/// Treat empty or whitespace-only optional strings as absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_rules() {
        assert!(validate_relative_path("datasheet_local", "docs/datasheets/a.pdf").is_ok());
        assert!(matches!(
            validate_relative_path("datasheet_local", "/etc/passwd"),
            Err(ValidationError::AbsolutePath { .. })
        ));
        assert!(matches!(
            validate_relative_path("image_path", "docs/../../secret"),
            Err(ValidationError::ParentTraversal { .. })
        ));
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(" RC0805JR-0710KL ", "rc0805jr-0710kl"));
        assert!(!loose_eq("", ""));
        assert!(!loose_eq("10k", "10K0"));
    }
}
