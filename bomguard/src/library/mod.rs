//! Design-asset libraries: "does footprint/symbol X exist?"
//!
//! The engine only asks existence questions through [`AssetLibraryGateway`];
//! how a library is laid out on disk is up to the implementation. Writing
//! into a project library happens only in [`promote`], after human review.

pub mod kicad;
pub mod promote;
pub mod sexp;

pub use kicad::KicadLibraryGateway;
pub use promote::{promote_review_asset, PromoteError, DEFAULT_ACCEPTED_LIBRARY};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Footprint,
    Symbol,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Footprint => "footprint",
            AssetKind::Symbol => "symbol",
        }
    }

    /// KiCad file extension for a single downloaded asset of this kind.
    pub fn file_extension(&self) -> &'static str {
        match self {
            AssetKind::Footprint => "kicad_mod",
            AssetKind::Symbol => "kicad_sym",
        }
    }
}

/// Which library set an asset was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryScope {
    Project,
    Standard,
}

/// Read-only existence oracle over footprint and symbol libraries.
pub trait AssetLibraryGateway: Send + Sync {
    /// Scope the named asset was found in, project libraries first.
    fn locate(&self, kind: AssetKind, name: &str) -> Option<LibraryScope>;

    fn exists(&self, kind: AssetKind, name: &str) -> bool {
        self.locate(kind, name).is_some()
    }
}

/// Fixed set of known assets, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLibrary {
    assets: HashMap<(AssetKind, String), LibraryScope>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_footprint(mut self, name: impl Into<String>, scope: LibraryScope) -> Self {
        self.assets.insert((AssetKind::Footprint, name.into()), scope);
        self
    }

    pub fn with_symbol(mut self, name: impl Into<String>, scope: LibraryScope) -> Self {
        self.assets.insert((AssetKind::Symbol, name.into()), scope);
        self
    }
}

impl AssetLibraryGateway for InMemoryLibrary {
    fn locate(&self, kind: AssetKind, name: &str) -> Option<LibraryScope> {
        self.assets.get(&(kind, name.trim().to_string())).copied()
    }
}
