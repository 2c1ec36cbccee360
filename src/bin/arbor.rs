//! arbor CLI tool
//!
//! Command-line interface for checking and maintaining a note vault with arbor-core.
//!
//! ## Commands
//!
//! - `check <vault>`: Load the vault and report schema findings
//! - `dangling <vault>`: List references that resolve to no note
//! - `rename <vault> <old> <new>`: Move a note and rewrite links to it

use arbor_core::{config::EngineConfig, engine::Engine, event::EngineEvent, ArborError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(author, version, about = "A tool for checking hierarchical note vaults", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a vault and display schema findings
    Check {
        /// Path to the vault directory
        vault: PathBuf,
    },

    /// List dangling references, per file with --verbose
    Dangling {
        /// Path to the vault directory
        vault: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Rename a note and rewrite links to it
    Rename {
        /// Path to the vault directory
        vault: PathBuf,
        /// Current hierarchical name
        old: String,
        /// New hierarchical name
        new: String,
    },
}

fn drain(rx: &mut UnboundedReceiver<EngineEvent>) {
    while let Ok(event) = rx.try_recv() {
        tracing::debug!("{event}");
    }
}

async fn open(vault: PathBuf) -> Result<(Engine, UnboundedReceiver<EngineEvent>), ArborError> {
    let (tx, rx) = unbounded_channel();
    let engine = Engine::for_config(EngineConfig::for_vault(vault)?).with_events(tx);
    Ok((engine, rx))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Check { vault } => {
                let (engine, mut rx) = open(vault).await?;
                let report = engine.init().await?;
                drain(&mut rx);
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("\n=== Vault ===");
                    println!("Notes: {} ({} stubs)", report.notes, report.stubs);
                    println!("Schema modules: {}", report.schema_modules);
                    println!("Dangling references: {}", report.dangling);
                    for finding in report.findings.iter() {
                        println!("  {finding}");
                    }
                }
                let broken = engine.built_in_test();
                if !broken.is_empty() {
                    return Err(ArborError::Command(broken.join("\n")).into());
                }
            }

            Commands::Dangling { vault, verbose } => {
                let (engine, mut rx) = open(vault).await?;
                engine.init().await?;
                drain(&mut rx);
                let cache = engine.cache()?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&cache)?);
                } else if verbose {
                    for (path, refs) in cache.dangling_by_file.iter() {
                        println!("{}", path.display());
                        for reference in refs {
                            println!("  [[{reference}]]");
                        }
                    }
                } else {
                    for reference in cache.dangling.iter() {
                        println!("{reference}");
                    }
                }
            }

            Commands::Rename { vault, old, new } => {
                let (engine, mut rx) = open(vault).await?;
                engine.init().await?;
                let report = engine.rename_note(&old, &new).await?;
                drain(&mut rx);
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!(
                        "Renamed {old} -> {new}: {} links in {} files",
                        report.replacements,
                        report.files.len()
                    );
                    for path in report.files.iter() {
                        println!("  {}", path.display());
                    }
                }
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
