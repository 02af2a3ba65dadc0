//! In-memory inventory with best-match search.

use std::collections::HashMap;

use crate::config::InventorySettings;
use crate::model::{loose_eq, Component, InventoryItem};

/// Owns every known physical part, keyed by unique part id.
///
/// Insertion order is preserved: match tie-breaks and listings follow the
/// order in which items were added (or loaded).
///
/// Records loaded from disk that break an invariant are quarantined rather
/// than dropped. They keep their id reserved and still take part in
/// matching, so the BOM line they would serve fails visibly instead of
/// silently falling back to its own data.
#[derive(Debug, Clone, Default)]
pub struct InventoryStore {
    items: Vec<InventoryItem>,
    index: HashMap<String, usize>,
    quarantined: Vec<InventoryItem>,
    load_errors: Vec<String>,
    ids: InventorySettings,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(ids: InventorySettings) -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            quarantined: Vec::new(),
            load_errors: Vec::new(),
            ids,
        }
    }

    /// Insert a new item. Returns `false` on a duplicate id or an invalid record.
    pub fn add(&mut self, item: InventoryItem) -> bool {
        if self.contains_id(&item.part_id) {
            tracing::debug!("Rejected duplicate inventory id {}", item.part_id);
            return false;
        }
        if let Err(e) = item.validate() {
            tracing::debug!("Rejected inventory item {}: {}", item.part_id, e);
            return false;
        }
        self.index.insert(item.part_id.clone(), self.items.len());
        self.items.push(item);
        true
    }

    /// Insert an item, assigning [`next_id`](Self::next_id) when its id is blank.
    ///
    /// Returns the id the item was stored under.
    pub fn add_with_next_id(&mut self, mut item: InventoryItem) -> Option<String> {
        if item.part_id.trim().is_empty() {
            item.part_id = self.next_id();
        }
        let id = item.part_id.clone();
        self.add(item).then_some(id)
    }

    pub fn get(&self, part_id: &str) -> Option<&InventoryItem> {
        self.index.get(part_id).map(|&i| &self.items[i])
    }

    fn contains_id(&self, part_id: &str) -> bool {
        self.index.contains_key(part_id) || self.quarantined.iter().any(|q| q.part_id == part_id)
    }

    /// Keep a record that fails validation. Returns `false` on a blank or
    /// duplicate id.
    pub fn quarantine(&mut self, item: InventoryItem) -> bool {
        if item.part_id.trim().is_empty() || self.contains_id(&item.part_id) {
            return false;
        }
        self.quarantined.push(item);
        true
    }

    /// Records held back because they break an invariant, in load order.
    pub fn quarantined(&self) -> impl Iterator<Item = &InventoryItem> {
        self.quarantined.iter()
    }

    /// Problems met while loading the backing file.
    pub fn load_errors(&self) -> &[String] {
        &self.load_errors
    }

    pub(crate) fn record_load_error(&mut self, error: impl Into<String>) {
        self.load_errors.push(error.into());
    }

    /// Replace an existing item with the same id. Returns `false` if absent or invalid.
    ///
    /// A valid replacement for a quarantined record releases it into the store.
    pub fn update(&mut self, item: InventoryItem) -> bool {
        if item.validate().is_err() {
            return false;
        }
        if let Some(&slot) = self.index.get(&item.part_id) {
            self.items[slot] = item;
            return true;
        }
        let Some(held) = self.quarantined.iter().position(|q| q.part_id == item.part_id) else {
            return false;
        };
        self.quarantined.remove(held);
        self.add(item)
    }

    pub fn remove(&mut self, part_id: &str) -> Option<InventoryItem> {
        if let Some(held) = self.quarantined.iter().position(|q| q.part_id == part_id) {
            return Some(self.quarantined.remove(held));
        }
        let slot = self.index.remove(part_id)?;
        let removed = self.items.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        Some(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn settings(&self) -> &InventorySettings {
        &self.ids
    }

    /// Next identifier in the `<prefix><zero-padded number>` scheme.
    ///
    /// One past the highest number in use, or the first identifier when no
    /// id follows the scheme. Ids outside the scheme are ignored; quarantined
    /// ids count as in use.
    pub fn next_id(&self) -> String {
        let prefix = self.ids.id_prefix.as_str();
        let highest = self
            .items
            .iter()
            .chain(&self.quarantined)
            .filter_map(|item| item.part_id.strip_prefix(prefix))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|digits| digits.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!(
            "{}{:0width$}",
            prefix,
            highest.saturating_add(1),
            width = self.ids.id_width
        )
    }

    /// Strict-priority best match for a BOM line.
    ///
    /// An MPN match always wins over a value+package match. Among value+package
    /// candidates, the first one carrying an MPN is preferred, then the first
    /// one overall. Within a tier valid records are searched before
    /// quarantined ones, so a quarantined hit means no valid record matched.
    pub fn find_match(&self, candidate: &Component) -> Option<&InventoryItem> {
        if let Some(mpn) = candidate.mpn() {
            if let Some(hit) = self
                .items
                .iter()
                .chain(&self.quarantined)
                .find(|item| item.mpn().is_some_and(|m| loose_eq(m, mpn)))
            {
                return Some(hit);
            }
        }

        let package = candidate.package()?;
        let value = candidate.value.trim();
        if value.is_empty() {
            return None;
        }

        value_package_match(&self.items, value, package)
            .or_else(|| value_package_match(&self.quarantined, value, package))
    }
}

fn value_package_match<'a>(items: &'a [InventoryItem], value: &str, package: &str) -> Option<&'a InventoryItem> {
    let mut first = None;
    for item in items {
        let value_hit = item.value().is_some_and(|v| loose_eq(v, value));
        let package_hit = item.package().is_some_and(|p| loose_eq(p, package));
        if value_hit && package_hit {
            if item.mpn().is_some() {
                return Some(item);
            }
            first.get_or_insert(item);
        }
    }
    first
}

impl FromIterator<InventoryItem> for InventoryStore {
    fn from_iter<T: IntoIterator<Item = InventoryItem>>(iter: T) -> Self {
        let mut store = InventoryStore::new();
        for item in iter {
            store.add(item);
        }
        store
    }
}
