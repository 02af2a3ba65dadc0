//! Coarse symbol existence check derived from the component value.

use crate::library::{AssetKind, AssetLibraryGateway, LibraryScope};
use crate::model::{Component, SymbolStatus};

/// Symbol reference guessed from a value: `Lib:Name` values are taken as-is,
/// bare values are looked up in `default_library`.
pub fn symbol_reference(value: &str, default_library: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.contains(':') {
        Some(value.to_string())
    } else {
        Some(format!("{default_library}:{value}"))
    }
}

pub fn check_symbol(component: &mut Component, library: &dyn AssetLibraryGateway, default_library: &str) {
    let Some(reference) = symbol_reference(&component.value, default_library) else {
        component.status.symbol = SymbolStatus::Missing;
        return;
    };
    component.status.symbol = match library.locate(AssetKind::Symbol, &reference) {
        Some(LibraryScope::Project) => SymbolStatus::ProjectLibrary,
        Some(LibraryScope::Standard) => SymbolStatus::StandardLibrary,
        None => {
            component.add_note(format!("Symbol '{reference}' not found (heuristic)"));
            SymbolStatus::Missing
        }
    };
}
