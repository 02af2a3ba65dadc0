//! End-to-end verification runs against in-memory collaborators.

mod common;

use bomguard::capabilities::{
    DatasheetStore, DocumentCapability, OfflineDocuments, PartLookupCapability, SuggestionCapability,
};
use bomguard::inventory::{self, load_bom, load_inventory};
use bomguard::library::{InMemoryLibrary, KicadLibraryGateway, LibraryScope};
use bomguard::model::{
    ConsistencyVerdict, DocumentCheckKind, FootprintOrigin, FootprintSource, SymbolStatus,
};
use bomguard::prelude::*;
use common::{
    fixture_path, NoDatasheets, RecordingDatasheets, RecordingLookup, RecordingSuggestions,
    ScriptedDocuments,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const R0805: &str = "Resistor_SMD:R_0805_2012Metric";
const C0603: &str = "Capacitor_SMD:C_0603_1608Metric";

fn resistor_item(source: FootprintSource) -> InventoryItem {
    InventoryItem::new("INV001", "10k resistor", R0805)
        .with_value("10k")
        .with_package("0805")
        .with_source(source)
}

fn store_with(items: Vec<InventoryItem>) -> InventoryStore {
    items.into_iter().collect()
}

struct Harness {
    orchestrator: VerificationOrchestrator,
    lookup: Arc<RecordingLookup>,
    suggestions: Arc<RecordingSuggestions>,
}

fn harness(
    store: InventoryStore,
    library: InMemoryLibrary,
    lookup: RecordingLookup,
    suggestions: RecordingSuggestions,
) -> Harness {
    harness_with_config(EngineConfig::default(), store, library, lookup, suggestions)
}

fn harness_with_config(
    config: EngineConfig,
    store: InventoryStore,
    library: InMemoryLibrary,
    lookup: RecordingLookup,
    suggestions: RecordingSuggestions,
) -> Harness {
    harness_with_documents(
        config,
        store,
        library,
        lookup,
        suggestions,
        Arc::new(OfflineDocuments),
        Arc::new(NoDatasheets),
    )
}

fn harness_with_documents(
    config: EngineConfig,
    store: InventoryStore,
    library: InMemoryLibrary,
    lookup: RecordingLookup,
    suggestions: RecordingSuggestions,
    documents: Arc<dyn DocumentCapability>,
    datasheets: Arc<dyn DatasheetStore>,
) -> Harness {
    let lookup = Arc::new(lookup);
    let suggestions = Arc::new(suggestions);
    let deps = EngineDeps {
        inventory: inventory::shared(store),
        library: Arc::new(library),
        part_lookup: Arc::clone(&lookup) as Arc<dyn PartLookupCapability>,
        suggestions: Arc::clone(&suggestions) as Arc<dyn SuggestionCapability>,
        documents,
        datasheets,
    };
    let orchestrator = VerificationOrchestrator::new(config, deps).unwrap();
    Harness {
        orchestrator,
        lookup,
        suggestions,
    }
}

fn r1() -> Component {
    Component::new("R1", "10k").with_package("0805")
}

#[tokio::test]
async fn test_manual_inventory_match_is_verified_without_external_calls() {
    let h = harness(
        store_with(vec![resistor_item(FootprintSource::Manual)]),
        InMemoryLibrary::new().with_footprint(R0805, LibraryScope::Standard),
        RecordingLookup::new(),
        RecordingSuggestions::new().answer("0805", "Resistor_SMD:R_0805_Other"),
    );
    let mut bom = vec![r1()];

    let report = h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    let r1 = &bom[0];
    assert_eq!(r1.footprint.as_deref(), Some(R0805));
    assert_eq!(r1.status.footprint_verified, FootprintVerification::Verified);
    assert_eq!(r1.provenance.as_deref(), Some("Inventory Match: INV001"));
    assert_eq!(h.lookup.search_count(), 0);
    assert_eq!(h.suggestions.call_count(), 0);
    assert_eq!(report.components_processed, 1);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_unknown_provenance_adopts_footprint_unverified() {
    let h = harness(
        store_with(vec![resistor_item(FootprintSource::Unknown)]),
        InMemoryLibrary::new().with_footprint(R0805, LibraryScope::Standard),
        RecordingLookup::new(),
        RecordingSuggestions::new().answer("0805", "Resistor_SMD:R_0805_Other"),
    );
    let mut bom = vec![r1()];

    h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    let r1 = &bom[0];
    assert_eq!(r1.footprint.as_deref(), Some(R0805));
    assert_eq!(r1.status.footprint_verified, FootprintVerification::Unverified);
    assert!(r1.status.footprint_exists);
    // Footprint exists, so the chain ends without asking for a suggestion.
    assert_eq!(h.suggestions.call_count(), 0);
    assert!(!r1.status.llm_suggested);
}

#[tokio::test]
async fn test_unknown_provenance_missing_footprint_falls_back_to_suggestion() {
    let h = harness(
        store_with(vec![resistor_item(FootprintSource::Unknown)]),
        InMemoryLibrary::new().with_footprint("Resistor_SMD:R_0805_Other", LibraryScope::Standard),
        RecordingLookup::new(),
        RecordingSuggestions::new().answer("0805", "Resistor_SMD:R_0805_Other"),
    );
    let mut bom = vec![r1()];

    let report = h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    let r1 = &bom[0];
    assert_eq!(h.suggestions.call_count(), 1);
    assert_eq!(r1.footprint.as_deref(), Some("Resistor_SMD:R_0805_Other"));
    assert!(r1.status.llm_suggested);
    assert_eq!(r1.status.footprint_verified, FootprintVerification::Unverified);
    assert_eq!(r1.status.footprint_origin, FootprintOrigin::Suggestion);
    assert!(r1.notes.iter().any(|n| n.contains("VERIFY MANUALLY")));
    assert_eq!(report.suggestions_made, 1);
}

#[tokio::test]
async fn test_lookup_failure_is_noted_and_run_continues() {
    let h = harness(
        InventoryStore::new(),
        InMemoryLibrary::new(),
        RecordingLookup::new().failing_for("NE555DR"),
        RecordingSuggestions::new(),
    );
    let mut bom = vec![
        Component::new("U1", "NE555").with_mpn("NE555DR"),
        Component::new("U2", "LM358").with_mpn("LM358DR"),
    ];

    let report = h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    assert_eq!(report.components_processed, 2);
    assert!(report.errors.is_empty());
    assert!(!bom[0].status.api_downloaded);
    assert!(bom[0].notes.iter().any(|n| n.starts_with("Part lookup failed for NE555DR")));
    assert_eq!(h.lookup.search_count(), 2);
}

#[tokio::test]
async fn test_api_download_marks_pending_review() {
    let review = tempfile::tempdir().unwrap();
    let mut config = EngineConfig::default();
    config.acquisition.review_dir = review.path().to_path_buf();
    let h = harness_with_config(
        config,
        InventoryStore::new(),
        InMemoryLibrary::new(),
        RecordingLookup::new().downloadable("NE555DR"),
        RecordingSuggestions::new(),
    );
    let mut bom = vec![Component::new("U1", "NE555").with_mpn("NE555DR").with_package("SOIC-8")];

    let report = h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    let u1 = &bom[0];
    assert!(u1.status.api_downloaded);
    assert_eq!(u1.status.footprint_verified, FootprintVerification::PendingReview);
    assert_eq!(u1.status.footprint_origin, FootprintOrigin::ApiDownload);
    assert!(u1.review_asset.as_ref().is_some_and(|p| p.starts_with(review.path())));
    assert_eq!(h.lookup.downloads.load(Ordering::SeqCst), 1);
    assert_eq!(report.pending_api_downloads, 1);

    // A second pass leaves the pending download alone.
    h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;
    assert_eq!(h.lookup.search_count(), 1);
    assert_eq!(bom[0].status.footprint_verified, FootprintVerification::PendingReview);
}

#[tokio::test]
async fn test_duplicate_reference_is_reported_not_fatal() {
    let h = harness(
        InventoryStore::new(),
        InMemoryLibrary::new(),
        RecordingLookup::new(),
        RecordingSuggestions::new(),
    );
    let mut bom = vec![r1(), Component::new("R1", "22k"), Component::new("R2", "1k")];

    let report = h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    assert_eq!(report.components_processed, 3);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("R1:"));
    assert_eq!(bom[1].value, "22k");
    assert!(bom[1].notes[0].starts_with("Verification failed"));
    assert!(bom[0].notes.iter().all(|n| !n.starts_with("Verification failed")));
}

#[tokio::test]
async fn test_invalid_component_keeps_original_state() {
    let h = harness(
        InventoryStore::new(),
        InMemoryLibrary::new(),
        RecordingLookup::new(),
        RecordingSuggestions::new(),
    );
    let mut bom = vec![Component::new("  ", "10k"), r1()];

    let report = h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.needs_review, 2);
    assert_eq!(bom[0].health, Default::default());
    assert!(bom[1].health.max > 0.0);
}

#[tokio::test]
async fn test_missing_weight_is_fatal_before_processing() {
    let json = std::fs::read_to_string(fixture_path("bad_config.json")).unwrap();
    assert!(EngineConfig::from_json_str(&json).is_err());

    let mut config = EngineConfig::default();
    config.health.points.footprint_inventory = -1.0;
    let deps = EngineDeps::offline(
        inventory::shared(InventoryStore::new()),
        Arc::new(InMemoryLibrary::new()),
        Arc::new(NoDatasheets),
    );
    let err = VerificationOrchestrator::new(config, deps).err().unwrap();
    assert!(matches!(err, BomGuardError::Config(_)));
}

#[tokio::test]
async fn test_cancellation_leaves_unprocessed_lines_untouched() {
    let h = harness(
        InventoryStore::new(),
        InMemoryLibrary::new(),
        RecordingLookup::new().with_delay(Duration::from_millis(200)),
        RecordingSuggestions::new(),
    );
    let mut bom: Vec<Component> = (1..=4)
        .map(|i| Component::new(format!("U{i}"), "NE555").with_mpn(format!("MPN{i}")))
        .collect();
    let original = bom.clone();
    let options = VerifyOptions {
        concurrency: Some(1),
        ..VerifyOptions::default()
    };

    let (tx, rx) = watch::channel(false);
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
    });
    let report = h.orchestrator.verify_cancellable(&mut bom, &options, rx).await;
    canceller.await.unwrap();

    assert!(report.cancelled);
    assert!(report.components_processed < 4);
    assert_eq!(bom[3], original[3]);
}

#[tokio::test]
async fn test_repeat_runs_are_deterministic() {
    let build = || {
        harness(
            store_with(vec![resistor_item(FootprintSource::Manual)]),
            InMemoryLibrary::new()
                .with_footprint(R0805, LibraryScope::Standard)
                .with_footprint(C0603, LibraryScope::Standard)
                .with_symbol("Device:10k", LibraryScope::Standard),
            RecordingLookup::new(),
            RecordingSuggestions::new().answer("0603", C0603),
        )
    };
    let bom = vec![r1(), Component::new("C1", "100nF").with_package("0603")];

    let mut first = bom.clone();
    let mut second = bom.clone();
    build().orchestrator.verify(&mut first, &VerifyOptions::default()).await;
    build().orchestrator.verify(&mut second, &VerifyOptions::default()).await;

    assert_eq!(first, second);
    assert_eq!(first[0].status.symbol, SymbolStatus::StandardLibrary);
}

#[tokio::test]
async fn test_fixture_project_run() {
    let config = EngineConfig::load_from_file(&fixture_path("config.json")).unwrap();
    let store = load_inventory(&fixture_path("inventory.json"), config.inventory.clone()).unwrap();
    // INV007 has no library prefix and is quarantined at load.
    assert_eq!(store.len(), 2);
    assert_eq!(store.quarantined().count(), 1);

    let root = fixture_path("");
    let library = KicadLibraryGateway::from_settings(&config.libraries, &root);
    let deps = EngineDeps::offline(inventory::shared(store), Arc::new(library), Arc::new(NoDatasheets));
    let orchestrator = VerificationOrchestrator::new(config, deps).unwrap();

    let mut bom = load_bom(&fixture_path("bom.json")).unwrap();
    let options = VerifyOptions {
        download_datasheets: false,
        ..VerifyOptions::default()
    };
    let report = orchestrator.verify_bom(&mut bom, &options).await;

    assert_eq!(report.components_processed, 4);
    assert!(report.errors.is_empty());
    assert!(report.inventory_errors.is_empty());

    let r1 = &bom.components[0];
    assert_eq!(r1.status.footprint_verified, FootprintVerification::Verified);
    assert!(r1.status.footprint_exists);

    let d1 = &bom.components[3];
    assert!(d1.status.footprint_exists);
    assert_eq!(d1.status.symbol, SymbolStatus::StandardLibrary);
    assert!(d1.notes.iter().any(|n| n == "Datasheet not stored locally"));

    let u1 = &bom.components[2];
    assert!(!u1.status.api_downloaded);
    assert!(u1.notes.iter().any(|n| n.contains("not available")));
}

#[tokio::test]
async fn test_verified_only_for_trusted_inventory_sources() {
    for source in [
        FootprintSource::Manual,
        FootprintSource::KitIngestVerified,
        FootprintSource::ApiVerified,
        FootprintSource::Unknown,
    ] {
        let h = harness(
            store_with(vec![resistor_item(source)]),
            InMemoryLibrary::new().with_footprint(R0805, LibraryScope::Standard),
            RecordingLookup::new(),
            RecordingSuggestions::new().answer("0805", R0805),
        );
        let mut bom = vec![r1(), r1().with_footprint(R0805)];
        bom[1].reference = "R2".to_string();

        for _ in 0..2 {
            h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;
            for component in &bom {
                assert_eq!(
                    component.status.footprint_verified.is_verified(),
                    source.is_trusted(),
                    "{} with {:?}",
                    component.reference,
                    source
                );
            }
        }
    }
}

#[tokio::test]
async fn test_undecodable_bom_line_fails_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bom.json");
    std::fs::write(
        &path,
        r#"{"components": [
            {"reference": "R1", "value": "10k", "package": "0805"},
            {"reference": "R2", "value": "1k", "status": {"footprint_verified": "maybe"}}
        ]}"#,
    )
    .unwrap();
    let h = harness(
        store_with(vec![resistor_item(FootprintSource::Manual)]),
        InMemoryLibrary::new().with_footprint(R0805, LibraryScope::Standard),
        RecordingLookup::new(),
        RecordingSuggestions::new(),
    );

    let mut bom = load_bom(&path).unwrap();
    let report = h.orchestrator.verify_bom(&mut bom, &VerifyOptions::default()).await;

    assert_eq!(report.components_processed, 2);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("R2: invalid BOM line"));
    assert!(report.review_refs.contains(&"R2".to_string()));
    assert_eq!(bom.components[0].status.footprint_verified, FootprintVerification::Verified);
}

#[tokio::test]
async fn test_quarantined_inventory_match_is_a_component_error() {
    let mut store = store_with(vec![resistor_item(FootprintSource::Manual)]);
    store.quarantine(
        InventoryItem::new("INV007", "misfiled cap", "NoLibraryPrefix")
            .with_value("100nF")
            .with_package("0603"),
    );
    let h = harness(
        store,
        InMemoryLibrary::new().with_footprint(R0805, LibraryScope::Standard),
        RecordingLookup::new(),
        RecordingSuggestions::new(),
    );
    let mut bom = vec![r1(), Component::new("C1", "100nF").with_package("0603")];

    let report = h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("C1: inventory item INV007 is invalid"));
    assert_ne!(bom[1].provenance.as_deref(), Some("BOM Defined"));
    assert!(bom[0].status.footprint_verified.is_verified());
}

#[tokio::test]
async fn test_inventory_load_errors_reach_the_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.json");
    std::fs::write(
        &path,
        r#"{"inventory_parts": [{"part_id": "INV001", "description": "x", "footprint": "Lib:X", "mounting": "glued"}]}"#,
    )
    .unwrap();
    let store = load_inventory(&path, Default::default()).unwrap();
    let h = harness(store, InMemoryLibrary::new(), RecordingLookup::new(), RecordingSuggestions::new());

    let report = h.orchestrator.verify(&mut vec![r1()], &VerifyOptions::default()).await;

    assert_eq!(report.inventory_errors.len(), 1);
    assert!(report.inventory_errors[0].starts_with("INV001: "));
    assert!(report.has_errors());
}

#[tokio::test]
async fn test_loaded_verified_state_without_trusted_origin_is_revoked() {
    let h = harness(
        InventoryStore::new(),
        InMemoryLibrary::new().with_footprint("Package_SO:SOIC-8", LibraryScope::Standard),
        RecordingLookup::new(),
        RecordingSuggestions::new(),
    );
    let line = r#"{"reference": "U1", "value": "NE555", "footprint": "Package_SO:SOIC-8",
        "status": {"footprint_verified": "verified", "llm_suggested": true,
                   "footprint_origin": {"kind": "suggestion"}}}"#;
    let mut bom = vec![serde_json::from_str::<Component>(line).unwrap()];

    let report = h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    let u1 = &bom[0];
    assert_eq!(u1.status.footprint_verified, FootprintVerification::Unverified);
    assert_eq!(u1.status.footprint_origin, FootprintOrigin::Suggestion);
    assert!(u1.notes.iter().any(|n| n.starts_with("Verification revoked")));
    assert!(u1.health.value < 2.0);
    assert!(report.errors.is_empty());
    assert_eq!(report.review_refs, vec!["U1".to_string()]);
}

#[tokio::test]
async fn test_reviewed_footprint_stays_verified_across_passes() {
    let h = harness(
        InventoryStore::new(),
        InMemoryLibrary::new().with_footprint("Package_SO:SOIC-8", LibraryScope::Standard),
        RecordingLookup::new(),
        RecordingSuggestions::new(),
    );
    let mut u1 = Component::new("U1", "NE555").with_footprint("Package_SO:SOIC-8").with_mpn("NE555DR");
    u1.confirm_footprint(FootprintSource::Manual);
    let mut bom = vec![u1];

    for _ in 0..2 {
        h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;
        assert!(bom[0].status.footprint_verified.is_verified());
    }
    assert_eq!(h.lookup.search_count(), 0);
}

#[tokio::test]
async fn test_datasheet_is_downloaded_on_demand() {
    let datasheets = Arc::new(RecordingDatasheets::new());
    let h = harness_with_documents(
        EngineConfig::default(),
        InventoryStore::new(),
        InMemoryLibrary::new(),
        RecordingLookup::new(),
        RecordingSuggestions::new(),
        Arc::new(OfflineDocuments),
        Arc::clone(&datasheets) as Arc<dyn DatasheetStore>,
    );
    let mut bom = vec![
        Component::new("D1", "LED").with_datasheet_url("https://example.invalid/led.pdf"),
        Component::new("D2", "LED"),
    ];

    let report = h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    assert_eq!(datasheets.downloads.load(Ordering::SeqCst), 1);
    assert_eq!(bom[0].datasheet_local.as_deref(), Some("datasheets/D1.pdf"));
    assert!(bom[0].status.datasheet_local);
    assert!(bom[1].notes.iter().any(|n| n.starts_with("No datasheet")));
    assert_eq!(report.missing_datasheet, 1);
}

#[tokio::test]
async fn test_datasheet_download_failure_is_a_note() {
    let datasheets = Arc::new(RecordingDatasheets::new().failing());
    let h = harness_with_documents(
        EngineConfig::default(),
        InventoryStore::new(),
        InMemoryLibrary::new(),
        RecordingLookup::new(),
        RecordingSuggestions::new(),
        Arc::new(OfflineDocuments),
        Arc::clone(&datasheets) as Arc<dyn DatasheetStore>,
    );
    let mut bom = vec![Component::new("D1", "LED").with_datasheet_url("https://example.invalid/led.pdf")];

    let report = h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    assert!(report.errors.is_empty());
    assert!(!bom[0].status.datasheet_local);
    assert!(bom[0].notes.iter().any(|n| n.starts_with("Datasheet download failed")));
}

#[tokio::test]
async fn test_document_checks_record_mismatch_and_failure() {
    let documents = Arc::new(ScriptedDocuments::new(ConsistencyVerdict::Mismatch));
    let h = harness_with_documents(
        EngineConfig::default(),
        InventoryStore::new(),
        InMemoryLibrary::new(),
        RecordingLookup::new(),
        RecordingSuggestions::new(),
        Arc::clone(&documents) as Arc<dyn DocumentCapability>,
        Arc::new(RecordingDatasheets::new().with_text("NE555 8-pin timer").preloaded("U1")),
    );
    let mut bom = vec![
        Component::new("U1", "NE555").with_package("SOIC-8"),
        Component::new("U2", "NE555").with_package("SOIC-8"),
    ];
    let options = VerifyOptions {
        check_documents: true,
        ..VerifyOptions::default()
    };

    let report = h.orchestrator.verify(&mut bom, &options).await;

    let u1 = &bom[0];
    assert_eq!(u1.status.doc_checks.len(), 1);
    assert_eq!(u1.status.doc_checks[0].kind, DocumentCheckKind::PinCount);
    assert_eq!(u1.status.doc_checks[0].result.verdict, ConsistencyVerdict::Mismatch);
    assert!(u1.notes.iter().any(|n| n.contains("PinCount mismatch")));
    assert!(u1.notes.iter().any(|n| n.starts_with("Package check failed")));
    assert!(u1.health.details.iter().any(|d| d.contains("mismatch")));

    // No local datasheet text: checks are skipped, not failed.
    assert!(bom[1].notes.iter().any(|n| n.starts_with("Doc checks skipped")));
    assert_eq!(documents.calls.load(Ordering::SeqCst), 2);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_hanging_lookup_times_out_while_other_lines_finish() {
    let mut config = EngineConfig::default();
    config.acquisition.capability_timeout_secs = 1;
    let h = harness_with_config(
        config,
        store_with(vec![resistor_item(FootprintSource::Manual)]),
        InMemoryLibrary::new().with_footprint(R0805, LibraryScope::Standard),
        RecordingLookup::new().with_delay(Duration::from_secs(30)),
        RecordingSuggestions::new(),
    );
    let mut bom = vec![Component::new("U1", "NE555").with_mpn("NE555DR"), r1()];

    let started = std::time::Instant::now();
    let report = h.orchestrator.verify(&mut bom, &VerifyOptions::default()).await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.components_processed, 2);
    assert!(report.errors.is_empty());
    assert!(bom[0]
        .notes
        .iter()
        .any(|n| n == "Part lookup failed for NE555DR: timed out after 1s"));
    assert!(bom[1].status.footprint_verified.is_verified());
}
