use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use crate::dates::DateOrder;
use crate::models::{ImportItem, ImportOptions, Layer};
use crate::pipeline::import_batch;
use crate::store::{EventQuery, EventStore, MemoryStore};

#[derive(Parser)]
#[command(name = "lifeweave")]
#[command(version = "0.1.0")]
#[command(about = "Import personal-history exports into one event timeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import export files (or directories of them) and print a summary
    Import {
        /// Files or directories to import
        paths: Vec<PathBuf>,
        /// Read ambiguous dates (06/05/2021) day-first instead of month-first
        #[arg(long)]
        day_first: bool,
        /// Owning-user identifier stamped on every event
        #[arg(long, default_value = "local")]
        user: String,
        /// Minimum classifier score before falling back to the default layer
        #[arg(long, default_value_t = 1)]
        min_score: u32,
        /// Print the imported events as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// List the seven layers every event is categorized into
    Layers,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Import { paths, day_first, user, min_score, json }) => {
            run_import(&paths, day_first, user, min_score, json)?;
        }
        Some(Commands::Layers) => {
            for layer in Layer::ALL {
                println!("{}", layer);
            }
        }
        None => {
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn run_import(
    paths: &[PathBuf],
    day_first: bool,
    user: String,
    min_score: u32,
    json: bool,
) -> Result<()> {
    let items = collect_items(paths)?;
    if items.is_empty() {
        anyhow::bail!("no importable files found");
    }

    let opts = ImportOptions {
        user_id: user,
        date_order: if day_first { DateOrder::DayFirst } else { DateOrder::MonthFirst },
        min_score,
        ..ImportOptions::default()
    };

    let result = import_batch(&items, &opts).context("import aborted on corrupt input")?;

    for error in &result.errors {
        eprintln!("warning: {}", error);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result.events)?);
        return Ok(());
    }

    let mut store = MemoryStore::new();
    store.insert_batch(result.events).context("storing imported events")?;

    println!("Import summary");
    println!("================================");
    println!("Items submitted: {}", result.stats.submitted);
    println!("  processed: {}", result.stats.processed);
    println!("  skipped:   {}", result.stats.skipped);
    println!("  errors:    {}", result.errors.len());
    println!("Events produced: {}", result.stats.events);
    for layer in Layer::ALL {
        if let Some(count) = result.stats.by_layer.get(&layer) {
            println!("  {:<14} {}", layer, count);
        }
    }

    let timeline = store.query(&EventQuery::default()).context("querying stored events")?;
    if let Some(oldest) = timeline.first() {
        println!("Oldest event: {}  {}", oldest.start.format("%Y-%m-%d %H:%M:%S"), oldest.title);
    }
    if let Some(newest) = timeline.last() {
        println!("Newest event: {}  {}", newest.start.format("%Y-%m-%d %H:%M:%S"), newest.title);
    }

    Ok(())
}

/// Materialize raw file bytes for the pipeline; reading is the caller's
/// side of the contract, the pipeline itself performs no I/O.
fn collect_items(paths: &[PathBuf]) -> Result<Vec<ImportItem>> {
    let mut items = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(false) {
                let entry = entry.with_context(|| format!("walking {}", path.display()))?;
                if entry.file_type().is_file() {
                    items.push(read_item(entry.path())?);
                }
            }
        } else {
            items.push(read_item(path)?);
        }
    }
    Ok(items)
}

fn read_item(path: &Path) -> Result<ImportItem> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(ImportItem::bytes(path.to_string_lossy(), bytes))
}
