mod bulk;
mod cli;
mod config;
mod error;
mod extract;
mod output;
mod record;
mod store;
mod walker;
mod watcher;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bulk::build_index;
use cli::{Cli, Commands, IndexArgs};
use config::IndexerConfig;
use output::{print_summary, print_watch_summary};
use record::record_key;
use watcher::event::{ChangeEvent, ChangeKind};
use watcher::incremental::{UpdateOutcome, apply_change};
use watcher::watch_corpus;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { index, json } => {
            let config = resolve_config(index)?;
            let stats = build_index(&config)
                .with_context(|| format!("failed to index {}", config.root.display()))?;
            print_summary(&stats, json);
        }
        Commands::Watch { index, json } => {
            let config = resolve_config(index)?;
            let stats = build_index(&config)
                .with_context(|| format!("failed to index {}", config.root.display()))?;
            print_summary(&stats, json);

            // The watcher only starts after the baseline is on disk.
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            let watch_stats = runtime
                .block_on(watch_corpus(&config))
                .with_context(|| format!("failed to watch {}", config.root.display()))?;
            print_watch_summary(&watch_stats, json);
        }
        Commands::Update { index, file } => {
            let config = resolve_config(index)?;
            let relative = file.strip_prefix(&config.root).unwrap_or(&file);
            let Some(key) = record_key(relative) else {
                bail!("{} is not inside {}", file.display(), config.root.display());
            };
            if !walker::has_indexed_extension(relative, &config.extension) {
                bail!("{} is not a .{} document", file.display(), config.extension);
            }

            let kind = if config.root.join(&key).is_file() {
                ChangeKind::Modified
            } else {
                ChangeKind::Removed
            };
            let event = ChangeEvent::new(kind, key);
            let outcome = apply_change(&event, &config)
                .with_context(|| format!("failed to update index for {}", event.path))?;

            match outcome {
                UpdateOutcome::Upserted => println!("Updated {}", event.path),
                UpdateOutcome::Removed => println!("Removed {}", event.path),
                UpdateOutcome::Dropped => println!("No change for {}", event.path),
            }
        }
    }

    Ok(())
}

fn resolve_config(args: IndexArgs) -> Result<IndexerConfig> {
    IndexerConfig::resolve(args.root, args.output, args.encoding)
        .context("invalid configuration")
}

/// Logs go to stderr; stdout carries only the command summaries.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
