//! JSON files for the inventory and the BOM.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::config::InventorySettings;
use crate::core::BomGuardError;
use crate::model::{Component, InventoryItem};

use super::InventoryStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    inventory_parts: Vec<Value>,
}

#[derive(Serialize)]
struct InventoryFileRef<'a> {
    inventory_parts: Vec<&'a InventoryItem>,
}

#[derive(Deserialize)]
struct RawBomFile {
    #[serde(default)]
    project_name: Option<String>,
    #[serde(default)]
    components: Vec<Value>,
}

#[derive(Serialize)]
struct RawBomFileRef<'a> {
    project_name: &'a Option<String>,
    components: Vec<Value>,
}

/// A BOM line that could not be turned into a [`Component`].
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedLine {
    /// Position of the line in the source file.
    pub index: usize,
    /// The line's reference designator, or `line <n>` when it has none.
    pub reference: String,
    pub error: String,
    /// The line as read, written back unchanged by [`save_bom`].
    pub raw: Option<Value>,
}

/// A BOM as exported for one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BomFile {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
    /// Lines that failed to decode. Verification reports each as a failed
    /// component.
    #[serde(skip)]
    pub rejected: Vec<RejectedLine>,
}

/// Reference designator of a raw line, falling back to its 1-based position.
pub(crate) fn line_reference(raw: Option<&Value>, index: usize) -> String {
    raw.and_then(|raw| raw.get("reference").or_else(|| raw.get("ref")))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map_or_else(|| format!("line {}", index + 1), str::to_string)
}

/// Load an inventory file into a new store.
///
/// A missing file yields an empty store. A record that decodes but breaks
/// an invariant is quarantined in the store; one that does not decode, or
/// repeats an id, is recorded in [`InventoryStore::load_errors`]. Either
/// way the rest of the inventory still loads.
pub fn load_inventory(path: &Path, settings: InventorySettings) -> Result<InventoryStore, BomGuardError> {
    let mut store = InventoryStore::with_settings(settings);
    if !path.exists() {
        tracing::info!("Inventory file {:?} not found, starting empty", path);
        return Ok(store);
    }

    let content = fs::read_to_string(path)?;
    let file: InventoryFile = serde_json::from_str(&content)?;
    let total = file.inventory_parts.len();

    for (index, raw) in file.inventory_parts.into_iter().enumerate() {
        let label = raw
            .get("part_id")
            .and_then(Value::as_str)
            .map_or_else(|| format!("record {}", index + 1), str::to_string);
        let item = match serde_json::from_value::<InventoryItem>(raw) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!("Malformed inventory record {}: {}", label, e);
                store.record_load_error(format!("{label}: {e}"));
                continue;
            }
        };
        if let Err(e) = item.validate() {
            tracing::warn!("Quarantining inventory record {}: {}", label, e);
            if !store.quarantine(item) {
                store.record_load_error(format!("{label}: {e}"));
            }
            continue;
        }
        if !store.add(item) {
            tracing::warn!("Duplicate inventory record {}", label);
            store.record_load_error(format!("{label}: duplicate part id"));
        }
    }

    tracing::info!(
        "Loaded {} of {} inventory parts from {:?} ({} quarantined)",
        store.len(),
        total,
        path,
        store.quarantined().count()
    );
    Ok(store)
}

/// Write the store back, quarantined records included.
pub fn save_inventory(store: &InventoryStore, path: &Path) -> Result<(), BomGuardError> {
    let file = InventoryFileRef {
        inventory_parts: store.iter().chain(store.quarantined()).collect(),
    };
    write_json(path, &file)?;
    tracing::info!("Saved {} inventory parts to {:?}", file.inventory_parts.len(), path);
    Ok(())
}

/// Load a BOM file, decoding each line on its own.
///
/// A line that does not decode lands in [`BomFile::rejected`] instead of
/// failing the whole file. Only unreadable or malformed JSON is an error.
pub fn load_bom(path: &Path) -> Result<BomFile, BomGuardError> {
    let content = fs::read_to_string(path)?;
    let raw: RawBomFile = serde_json::from_str(&content)?;

    let mut bom = BomFile {
        project_name: raw.project_name,
        ..BomFile::default()
    };
    for (index, line) in raw.components.into_iter().enumerate() {
        match Component::deserialize(&line) {
            Ok(component) => bom.components.push(component),
            Err(e) => {
                let reference = line_reference(Some(&line), index);
                tracing::warn!("Rejected BOM line {}: {}", reference, e);
                bom.rejected.push(RejectedLine {
                    index,
                    reference,
                    error: e.to_string(),
                    raw: Some(line),
                });
            }
        }
    }

    tracing::info!(
        "Loaded {} BOM lines from {:?} ({} rejected)",
        bom.components.len(),
        path,
        bom.rejected.len()
    );
    Ok(bom)
}

/// Save a BOM, putting rejected lines back at their original positions.
pub fn save_bom(bom: &BomFile, path: &Path) -> Result<(), BomGuardError> {
    let mut lines = Vec::with_capacity(bom.components.len() + bom.rejected.len());
    let mut components = bom.components.iter();
    let mut rejected = bom
        .rejected
        .iter()
        .filter_map(|r| r.raw.as_ref().map(|raw| (r.index, raw)))
        .peekable();

    loop {
        if let Some(&(index, raw)) = rejected.peek() {
            if index <= lines.len() {
                lines.push(raw.clone());
                rejected.next();
                continue;
            }
        }
        match components.next() {
            Some(component) => lines.push(serde_json::to_value(component)?),
            None => break,
        }
    }
    lines.extend(rejected.map(|(_, raw)| raw.clone()));

    let count = lines.len();
    let file = RawBomFileRef {
        project_name: &bom.project_name,
        components: lines,
    };
    write_json(path, &file)?;
    tracing::info!("Saved {} BOM lines to {:?}", count, path);
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), BomGuardError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
