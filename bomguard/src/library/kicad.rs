//! Filesystem gateway over KiCad footprint and symbol libraries.
//!
//! Footprints live one file per footprint in `<Library>.pretty/<Name>.kicad_mod`.
//! Symbols live together in `<Library>.kicad_sym`, so symbol libraries are
//! parsed once and their names cached.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use super::sexp;
use super::{AssetKind, AssetLibraryGateway, LibraryScope};
use crate::config::LibrarySettings;

#[derive(Debug)]
pub struct KicadLibraryGateway {
    project_dirs: Vec<PathBuf>,
    footprint_dirs: Vec<PathBuf>,
    symbol_dirs: Vec<PathBuf>,
    symbol_cache: RwLock<HashMap<PathBuf, Arc<HashSet<String>>>>,
}

impl KicadLibraryGateway {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dirs: vec![project_dir.into()],
            footprint_dirs: Vec::new(),
            symbol_dirs: Vec::new(),
            symbol_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Build from configuration, resolving relative directories against `root`.
    pub fn from_settings(settings: &LibrarySettings, root: &Path) -> Self {
        let resolve = |p: &PathBuf| if p.is_absolute() { p.clone() } else { root.join(p) };
        Self {
            project_dirs: vec![resolve(&settings.project_dir)],
            footprint_dirs: settings.footprint_dirs.iter().map(resolve).collect(),
            symbol_dirs: settings.symbol_dirs.iter().map(resolve).collect(),
            symbol_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_footprint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.footprint_dirs.push(dir.into());
        self
    }

    pub fn with_symbol_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.symbol_dirs.push(dir.into());
        self
    }

    fn standard_dirs(&self, kind: AssetKind) -> &[PathBuf] {
        match kind {
            AssetKind::Footprint => &self.footprint_dirs,
            AssetKind::Symbol => &self.symbol_dirs,
        }
    }

    fn found_in(&self, kind: AssetKind, dir: &Path, library: &str, name: &str) -> bool {
        match kind {
            AssetKind::Footprint => dir
                .join(format!("{library}.pretty"))
                .join(format!("{name}.kicad_mod"))
                .is_file(),
            AssetKind::Symbol => self
                .symbol_names(&dir.join(format!("{library}.kicad_sym")))
                .is_some_and(|names| names.contains(name)),
        }
    }

    fn symbol_names(&self, path: &Path) -> Option<Arc<HashSet<String>>> {
        if let Some(names) = self
            .symbol_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Some(Arc::clone(names));
        }
        if !path.is_file() {
            return None;
        }

        let names = Arc::new(read_symbol_names(path));
        self.symbol_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), Arc::clone(&names));
        Some(names)
    }
}

fn read_symbol_names(path: &Path) -> HashSet<String> {
    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| sexp::parse(&text).map_err(|e| e.to_string()));
    match parsed {
        Ok(lib) => {
            let names: HashSet<String> = lib
                .children("symbol")
                .filter_map(|s| s.atom_at(1))
                .map(str::to_string)
                .collect();
            tracing::debug!("Loaded {} symbols from {:?}", names.len(), path);
            names
        }
        Err(e) => {
            tracing::warn!("Could not read symbol library {:?}: {}", path, e);
            HashSet::new()
        }
    }
}

impl AssetLibraryGateway for KicadLibraryGateway {
    fn locate(&self, kind: AssetKind, name: &str) -> Option<LibraryScope> {
        let (library, item) = name.trim().split_once(':')?;
        if library.is_empty() || item.is_empty() {
            return None;
        }
        if self
            .project_dirs
            .iter()
            .any(|dir| self.found_in(kind, dir, library, item))
        {
            return Some(LibraryScope::Project);
        }
        self.standard_dirs(kind)
            .iter()
            .any(|dir| self.found_in(kind, dir, library, item))
            .then_some(LibraryScope::Standard)
    }
}
