//! Promote accepted review downloads into the project footprint library.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::AssetKind;
use crate::model::{Component, FootprintSource};

/// Library accepted footprints land in when none is named.
pub const DEFAULT_ACCEPTED_LIBRARY: &str = "Project_Footprints";

#[derive(Debug, Error)]
pub enum PromoteError {
    #[error("{0} has no review asset")]
    NoReviewAsset(String),
    #[error("review asset {0:?} is not a footprint file")]
    NotAFootprint(PathBuf),
    #[error("review asset {0:?} not found")]
    Missing(PathBuf),
    #[error("invalid library name '{0}'")]
    LibraryName(String),
    #[error("{0:?} already exists in the project library")]
    AlreadyExists(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Move `component`'s review asset into `<project_lib_dir>/<library>.pretty/`.
///
/// The footprint is reassigned to `<library>:<file stem>` and confirmed as a
/// manual decision. Returns the new footprint reference.
pub fn promote_review_asset(
    component: &mut Component,
    project_lib_dir: &Path,
    library: &str,
) -> Result<String, PromoteError> {
    let library = library.trim();
    if library.is_empty() || library.contains([':', '/', '\\']) {
        return Err(PromoteError::LibraryName(library.to_string()));
    }
    let source = component
        .review_asset
        .clone()
        .ok_or_else(|| PromoteError::NoReviewAsset(component.reference.clone()))?;

    let extension = AssetKind::Footprint.file_extension();
    let name = match (source.file_stem().and_then(|s| s.to_str()), source.extension()) {
        (Some(stem), Some(ext)) if ext == extension => stem.to_string(),
        _ => return Err(PromoteError::NotAFootprint(source)),
    };
    if !source.is_file() {
        return Err(PromoteError::Missing(source));
    }

    let target_dir = project_lib_dir.join(format!("{library}.pretty"));
    let target = target_dir.join(format!("{name}.{extension}"));
    if target.exists() {
        return Err(PromoteError::AlreadyExists(target));
    }
    fs::create_dir_all(&target_dir)?;
    move_file(&source, &target)?;
    if let Some(parent) = source.parent() {
        // Only succeeds once the review folder is empty.
        let _ = fs::remove_dir(parent);
    }

    let footprint = format!("{library}:{name}");
    tracing::info!("{}: promoted {:?} to {}", component.reference, source, footprint);

    component.footprint = Some(footprint.clone());
    component.review_asset = None;
    component.status.api_downloaded = false;
    component.status.footprint_exists = true;
    component.confirm_footprint(FootprintSource::Manual);
    component.provenance = Some(format!("Accepted Review: {footprint}"));
    Ok(footprint)
}

/// Rename, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
