//! Simple verification example: check a BOM against an inventory and print results.

use bomguard::capabilities::FsDatasheetStore;
use bomguard::inventory::{self, load_bom, load_inventory};
use bomguard::library::KicadLibraryGateway;
use bomguard::prelude::*;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), BomGuardError> {
    let mut args = std::env::args().skip(1);
    let bom_path = args.next().unwrap_or_else(|| "tests/fixtures/bom.json".to_string());
    let inventory_path = args
        .next()
        .unwrap_or_else(|| "tests/fixtures/inventory.json".to_string());
    let bom_path = Path::new(&bom_path);

    if !bom_path.exists() {
        eprintln!("File not found: {}", bom_path.display());
        eprintln!("Usage: cargo run --example simple_verification [bom.json] [inventory.json]");
        std::process::exit(1);
    }
    let root = bom_path.parent().unwrap_or(Path::new("."));

    let config = EngineConfig::default();
    let store = load_inventory(Path::new(&inventory_path), config.inventory.clone())?;
    let deps = EngineDeps::offline(
        inventory::shared(store),
        Arc::new(KicadLibraryGateway::from_settings(&config.libraries, root)),
        Arc::new(FsDatasheetStore::new(root).offline(true)),
    );
    let orchestrator = VerificationOrchestrator::new(config, deps)?;

    let mut bom = load_bom(bom_path)?;
    let options = VerifyOptions {
        download_datasheets: false,
        ..VerifyOptions::default()
    };
    let report = orchestrator.verify(&mut bom.components, &options).await;

    println!("Verification results for: {}", bom_path.display());
    println!("Components: {}", report.components_processed);
    println!();

    for component in &bom.components {
        println!(
            "{:<6} {:<10} {:>4.1}/{:.1}  {:?}",
            component.reference,
            component.value,
            component.health.value,
            component.health.max,
            component.status.footprint_verified
        );
        for note in &component.notes {
            println!("    - {}", note);
        }
    }

    if report.has_review_items() {
        println!("\n{} component(s) need review.", report.needs_review);
        std::process::exit(1);
    }

    println!("\nAll components verified.");
    Ok(())
}
