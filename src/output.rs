use std::path::PathBuf;

use serde::Serialize;

/// Aggregate statistics produced by a bulk build.
#[derive(Debug, Serialize)]
pub struct BuildStats {
    /// Documents written to the artifact.
    pub indexed: usize,
    /// Documents left out because extraction failed.
    pub skipped: usize,
    pub output: PathBuf,
    /// Wall-clock time for the build in seconds.
    pub elapsed_secs: f64,
}

/// Counters for one watch session.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct WatchStats {
    /// Created/modified events that ended in a saved upsert.
    pub applied: usize,
    /// Removal events that dropped a record.
    pub removed: usize,
    /// Events dropped without touching the index (extraction failed, or nothing to remove).
    pub dropped: usize,
    /// Updates that failed with a store or persist error.
    pub failed: usize,
}

/// Print a summary of the build.
///
/// - `json = true`: emit a pretty-printed JSON object to stdout.
/// - `json = false`: emit a cargo-style human-readable summary to stdout.
///
/// If `stats.skipped > 0`, a warning line is written to **stderr** so that
/// the stdout stream remains clean for downstream JSON consumers.
pub fn print_summary(stats: &BuildStats, json: bool) {
    if json {
        match serde_json::to_string_pretty(stats) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising stats: {}", e),
        }
        return;
    }

    println!(
        "Indexed {} documents in {:.2}s",
        stats.indexed, stats.elapsed_secs
    );
    println!("  saved to {}", stats.output.display());

    if stats.skipped > 0 {
        eprintln!("  {} documents skipped (extraction errors)", stats.skipped);
    }
}

/// Print the counters of a finished watch session.
pub fn print_watch_summary(stats: &WatchStats, json: bool) {
    if json {
        match serde_json::to_string_pretty(stats) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising stats: {}", e),
        }
        return;
    }

    println!(
        "Stopped watching: {} updated, {} removed, {} dropped, {} failed",
        stats.applied, stats.removed, stats.dropped, stats.failed
    );
}
