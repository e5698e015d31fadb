use tracing::{debug, info, warn};

use crate::config::IndexerConfig;
use crate::error::IndexResult;
use crate::extract::extract_document;
use crate::store::{self, IndexStore};

use super::event::{ChangeEvent, ChangeKind};

/// What a single update did to the stored index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The document was (re-)extracted and its record written.
    Upserted,
    /// The document's record was removed.
    Removed,
    /// Nothing was written: extraction failed, or there was no record to remove.
    Dropped,
}

/// Apply one change event to the artifact at `config.output`.
///
/// For Created/Modified: load the current index, re-extract the document, upsert it
/// (the record moves to the end) and save. If extraction fails the event is dropped
/// and the stored index is not touched.
///
/// For Removed: load, drop the record and save; no write if the path was not indexed.
/// RemovedTree does the same for the path and every record beneath it.
///
/// Every call reloads the artifact, so repeated or reordered events for the same path
/// converge on whichever extraction ran last. Callers must not run two updates at once.
pub fn apply_change(event: &ChangeEvent, config: &IndexerConfig) -> IndexResult<UpdateOutcome> {
    let store = IndexStore::new(&config.output);
    let current = store.load()?;

    match event.kind {
        ChangeKind::Created | ChangeKind::Modified => {
            let file = config.root.join(&event.path);
            let record = match extract_document(&file, &event.path, config.encoding) {
                Ok(record) => record,
                Err(failure) => {
                    warn!("dropping {:?} event: {failure}", event.kind);
                    return Ok(UpdateOutcome::Dropped);
                }
            };

            store.save(&store::upsert(current, record))?;
            info!("updated {}", event.path);
            Ok(UpdateOutcome::Upserted)
        }
        ChangeKind::Removed => {
            let (remaining, removed) = store::remove(current, &event.path);
            if !removed {
                debug!("{} was not indexed, nothing to remove", event.path);
                return Ok(UpdateOutcome::Dropped);
            }

            store.save(&remaining)?;
            info!("removed {}", event.path);
            Ok(UpdateOutcome::Removed)
        }
        ChangeKind::RemovedTree => {
            let (remaining, removed) = store::remove_tree(current, &event.path);
            if removed == 0 {
                debug!("nothing indexed under {}", event.path);
                return Ok(UpdateOutcome::Dropped);
            }

            store.save(&remaining)?;
            info!("removed {removed} record(s) under {}", event.path);
            Ok(UpdateOutcome::Removed)
        }
    }
}
