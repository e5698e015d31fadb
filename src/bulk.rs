use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::IndexerConfig;
use crate::error::{ExtractionFailure, IndexResult};
use crate::extract::extract_document;
use crate::output::BuildStats;
use crate::record::{DocumentRecord, record_key};
use crate::store::IndexStore;
use crate::walker::scan_corpus;

/// Log an `info!` progress line after this many extracted documents.
const PROGRESS_INTERVAL: usize = 500;

/// Build a fresh index from every document under `config.root` and write it to
/// `config.output`, replacing whatever was there.
///
/// Documents that fail extraction are logged and left out. A scan or persist failure
/// aborts the build and nothing is written.
pub fn build_index(config: &IndexerConfig) -> IndexResult<BuildStats> {
    let start = Instant::now();

    let files = scan_corpus(&config.root, &config.extension)?;
    info!("indexing {} document(s) under {}", files.len(), config.root.display());

    let total = files.len();
    let done = AtomicUsize::new(0);

    // Extraction is independent per file; `collect` keeps scan order.
    let results: Vec<Result<DocumentRecord, ExtractionFailure>> = files
        .par_iter()
        .filter_map(|relative| {
            let key = record_key(relative)?;
            let result = extract_document(&config.root.join(relative), &key, config.encoding);

            let count = done.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("[{count}/{total}] {key}");
            if count % PROGRESS_INTERVAL == 0 {
                info!("extracted {count} of {total} document(s)");
            }
            Some(result)
        })
        .collect();

    let mut records = Vec::with_capacity(results.len());
    let mut skipped = 0;
    for result in results {
        match result {
            Ok(record) => records.push(record),
            Err(failure) => {
                warn!("skipping document: {failure}");
                skipped += 1;
            }
        }
    }

    let store = IndexStore::new(&config.output);
    store.save(&records)?;

    let stats = BuildStats {
        indexed: records.len(),
        skipped,
        output: config.output.clone(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    info!("wrote {} record(s) to {}", stats.indexed, store.path().display());
    Ok(stats)
}
