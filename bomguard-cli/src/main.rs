//! BomGuard CLI - verify a BOM against the parts inventory and KiCad libraries.

use anyhow::{Context, Result};
use bomguard::capabilities::{FsDatasheetStore, OllamaClient, SnapEdaClient};
use bomguard::inventory::{self, load_bom, load_inventory, load_kicad_export, save_bom};
use bomguard::library::{promote_review_asset, KicadLibraryGateway, DEFAULT_ACCEPTED_LIBRARY};
use bomguard::{
    Component, EngineConfig, EngineDeps, InventoryStore, VerificationOrchestrator,
    VerificationReport, VerifyOptions,
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bomguard")]
#[command(about = "BOM verification against inventory and KiCad libraries", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a verification pass over a BOM file
    Verify {
        /// Path to the BOM JSON file
        #[arg(value_name = "BOM")]
        bom: PathBuf,

        /// Inventory JSON file
        #[arg(short, long, default_value = "inventory.json")]
        inventory: PathBuf,

        /// Engine configuration JSON (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Project root for libraries, datasheets and review downloads
        #[arg(long)]
        project_root: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Write the updated BOM back to its file
        #[arg(long)]
        write: bool,

        /// Run datasheet consistency checks
        #[arg(long)]
        doc_checks: bool,

        /// Do not contact any network service
        #[arg(long)]
        offline: bool,

        /// Exit with code 1 if any component needs review
        #[arg(long)]
        fail_on_review: bool,

        /// Components verified concurrently (overrides the config)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Inspect the parts inventory
    Inventory {
        /// Inventory JSON file
        #[arg(short, long, default_value = "inventory.json")]
        inventory: PathBuf,

        /// Engine configuration JSON (for the id scheme)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        action: InventoryAction,
    },

    /// Convert a KiCad CSV or XML BOM export into a BOM JSON file
    Import {
        /// KiCad BOM export (.csv or .xml)
        #[arg(value_name = "EXPORT")]
        export: PathBuf,

        /// Output BOM JSON file (defaults to the export path with a .json extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Project name recorded in the BOM
        #[arg(long)]
        project_name: Option<String>,

        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
    },

    /// Promote reviewed footprint downloads into the project library
    Accept {
        /// Path to the BOM JSON file
        #[arg(value_name = "BOM")]
        bom: PathBuf,

        /// References whose review download was accepted
        #[arg(value_name = "REF", required = true)]
        references: Vec<String>,

        /// Engine configuration JSON (for the project library directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Project root the library directory is relative to
        #[arg(long)]
        project_root: Option<PathBuf>,

        /// Footprint library accepted assets are moved into
        #[arg(long, default_value = DEFAULT_ACCEPTED_LIBRARY)]
        library: String,
    },

    /// Print the default engine configuration
    Config,
}

#[derive(Subcommand)]
enum InventoryAction {
    /// List all parts
    List {
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    /// Print the next free part id
    NextId,
    /// Show the best inventory match for a part
    Match {
        #[arg(long)]
        mpn: Option<String>,
        #[arg(long, default_value = "")]
        value: String,
        #[arg(long)]
        package: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Verify {
            bom,
            inventory,
            config,
            project_root,
            format,
            write,
            doc_checks,
            offline,
            fail_on_review,
            concurrency,
        } => {
            let root = project_root.unwrap_or_else(|| project_dir_of(&bom));
            let options = VerifyOptions {
                check_documents: doc_checks,
                download_datasheets: !offline,
                concurrency,
            };
            handle_verify(&bom, &inventory, config.as_deref(), &root, format, write, offline, &options)
                .await
                .map(|report| i32::from(fail_on_review && report.has_review_items()))
        }
        Commands::Inventory {
            inventory,
            config,
            action,
        } => {
            let config = load_config(config.as_deref())?;
            let store = load_inventory(&inventory, config.inventory)
                .with_context(|| format!("failed to load inventory {}", inventory.display()))?;
            handle_inventory(&store, action)
        }
        Commands::Import {
            export,
            output,
            project_name,
            force,
        } => {
            let output = output.unwrap_or_else(|| export.with_extension("json"));
            handle_import(&export, &output, project_name, force)
        }
        Commands::Accept {
            bom,
            references,
            config,
            project_root,
            library,
        } => {
            let root = project_root.unwrap_or_else(|| project_dir_of(&bom));
            handle_accept(&bom, &references, config.as_deref(), &root, &library)
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&EngineConfig::default())?);
            Ok(0)
        }
    }
}

fn project_dir_of(bom: &Path) -> PathBuf {
    match bom.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("invalid configuration {}", path.display())),
        None => {
            let mut config = EngineConfig::default();
            config.apply_env();
            Ok(config)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_verify(
    bom_path: &Path,
    inventory_path: &Path,
    config_path: Option<&Path>,
    root: &Path,
    format: OutputFormat,
    write: bool,
    offline: bool,
    options: &VerifyOptions,
) -> Result<VerificationReport> {
    let mut config = load_config(config_path)?;
    if config.acquisition.review_dir.is_relative() {
        config.acquisition.review_dir = root.join(&config.acquisition.review_dir);
    }

    let store = load_inventory(inventory_path, config.inventory.clone())
        .with_context(|| format!("failed to load inventory {}", inventory_path.display()))?;
    let mut bom = load_bom(bom_path).with_context(|| format!("failed to load BOM {}", bom_path.display()))?;

    let deps = build_deps(&config, store, root, offline).await;
    let orchestrator = VerificationOrchestrator::new(config, deps)?;
    let report = orchestrator.verify_bom(&mut bom, options).await;

    match format {
        OutputFormat::Human => output_human(bom.project_name.as_deref(), &bom.components, &report),
        OutputFormat::Json => output_json(&bom.components, &report)?,
    }

    if write {
        save_bom(&bom, bom_path).with_context(|| format!("failed to write {}", bom_path.display()))?;
    }
    Ok(report)
}

async fn build_deps(config: &EngineConfig, store: InventoryStore, root: &Path, offline: bool) -> EngineDeps {
    let library = Arc::new(KicadLibraryGateway::from_settings(&config.libraries, root));
    let datasheets = Arc::new(FsDatasheetStore::new(root).offline(offline));
    let mut deps = EngineDeps::offline(inventory::shared(store), library, datasheets);
    if offline {
        tracing::info!("Offline run: part lookup and suggestions disabled");
        return deps;
    }

    let services = &config.services;
    if services.snapeda_api_key.is_some() {
        tracing::info!("Using SnapEDA part lookup");
        deps.part_lookup = Arc::new(SnapEdaClient::new(
            services.snapeda_api_key.clone(),
            services.snapeda_url.clone(),
        ));
    }
    if services.ollama_url.is_some() {
        let ollama = Arc::new(OllamaClient::new(
            services.ollama_url.clone(),
            services.ollama_model.clone(),
        ));
        if ollama.health_check().await {
            tracing::info!("Using Ollama at {:?} with model {}", services.ollama_url, ollama.model());
            deps.suggestions = ollama.clone();
            deps.documents = ollama;
        } else {
            tracing::warn!(
                "Ollama unavailable at {:?} (model {}), suggestions and doc checks disabled",
                services.ollama_url,
                ollama.model()
            );
        }
    }
    deps
}

fn output_human(project: Option<&str>, components: &[Component], report: &VerificationReport) {
    if let Some(project) = project {
        println!("\nProject: {}", project);
    }
    println!("{}", "─".repeat(60));

    for component in components {
        println!(
            "  {:<8} {:<12} {:>4.1}/{:.1}  {:?}",
            component.reference,
            component.value,
            component.health.value,
            component.health.max,
            component.status.footprint_verified
        );
        if let Some(ref footprint) = component.footprint {
            println!("      Footprint: {}", footprint);
        }
        for note in &component.notes {
            println!("      - {}", note);
        }
    }

    if !report.errors.is_empty() {
        println!("\n  ERRORS:");
        for error in &report.errors {
            println!("    - {}", error);
        }
    }
    if !report.inventory_errors.is_empty() {
        println!("\n  INVENTORY ERRORS:");
        for error in &report.inventory_errors {
            println!("    - {}", error);
        }
    }

    println!("\n  Summary:");
    println!("    Processed:          {}", report.components_processed);
    println!("    Needs review:       {}", report.needs_review);
    println!("    Missing footprint:  {}", report.missing_footprint);
    println!("    Missing symbol:     {}", report.missing_symbol);
    println!("    Missing datasheet:  {}", report.missing_datasheet);
    println!("    Pending downloads:  {}", report.pending_api_downloads);
    println!("    Suggestions:        {}", report.suggestions_made);
    if report.cancelled {
        println!("    (run cancelled)");
    }
}

fn output_json(components: &[Component], report: &VerificationReport) -> Result<()> {
    let output = serde_json::json!({
        "report": report,
        "components": components,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn handle_import(export: &Path, output: &Path, project_name: Option<String>, force: bool) -> Result<i32> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }
    let mut bom = load_kicad_export(export).with_context(|| format!("failed to import {}", export.display()))?;
    if project_name.is_some() {
        bom.project_name = project_name;
    }
    for line in &bom.rejected {
        eprintln!("Skipped {}: {}", line.reference, line.error);
    }
    save_bom(&bom, output).with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "Imported {} components into {} ({} rows skipped)",
        bom.components.len(),
        output.display(),
        bom.rejected.len()
    );
    Ok(0)
}

fn handle_accept(
    bom_path: &Path,
    references: &[String],
    config_path: Option<&Path>,
    root: &Path,
    library: &str,
) -> Result<i32> {
    let config = load_config(config_path)?;
    let lib_dir = match &config.libraries.project_dir {
        dir if dir.is_absolute() => dir.clone(),
        dir => root.join(dir),
    };
    let mut bom = load_bom(bom_path).with_context(|| format!("failed to load BOM {}", bom_path.display()))?;

    let mut failed = 0;
    for reference in references {
        let Some(component) = bom.components.iter_mut().find(|c| c.reference.trim() == reference.trim()) else {
            eprintln!("{}: not in the BOM", reference);
            failed += 1;
            continue;
        };
        match promote_review_asset(component, &lib_dir, library) {
            Ok(footprint) => println!("{} -> {}", component.reference, footprint),
            Err(e) => {
                eprintln!("{}: {}", reference, e);
                failed += 1;
            }
        }
    }

    save_bom(&bom, bom_path).with_context(|| format!("failed to write {}", bom_path.display()))?;
    Ok(i32::from(failed > 0))
}

fn handle_inventory(store: &InventoryStore, action: InventoryAction) -> Result<i32> {
    match action {
        InventoryAction::List { format } => match format {
            OutputFormat::Human => {
                for item in store.iter() {
                    println!(
                        "{:<8} {:<32} {:<40} {}",
                        item.part_id,
                        item.description,
                        item.footprint,
                        item.footprint_source.as_str()
                    );
                }
                println!("\n{} parts", store.len());
            }
            OutputFormat::Json => {
                let items: Vec<_> = store.iter().collect();
                println!("{}", serde_json::to_string_pretty(&items)?);
            }
        },
        InventoryAction::NextId => println!("{}", store.next_id()),
        InventoryAction::Match { mpn, value, package } => {
            let mut candidate = Component::new("?", value);
            candidate.mpn = mpn;
            candidate.package = package;
            match store.find_match(&candidate) {
                Some(item) => println!("{} {} ({})", item.part_id, item.footprint, item.footprint_source.as_str()),
                None => {
                    println!("No match");
                    return Ok(1);
                }
            }
        }
    }
    Ok(0)
}
