pub mod event;
pub mod incremental;

use std::future::Future;
use std::path::Path;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::IndexerConfig;
use crate::error::{IndexError, IndexResult};
use crate::output::WatchStats;
use crate::record::record_key;
use crate::walker::{has_indexed_extension, scan_corpus};

use event::{ChangeEvent, ChangeKind};
use incremental::{UpdateOutcome, apply_change};

/// Handle to a running watcher. Dropping it releases the OS subscription, which in
/// turn ends the bridge task.
pub struct WatcherHandle {
    /// Keep alive: dropping the watcher stops the OS watcher.
    _watcher: RecommendedWatcher,
    /// The bridge task forwarding events from std channel to tokio channel.
    _bridge_task: JoinHandle<()>,
}

/// Start a recursive watcher on `root`.
///
/// Returns a `WatcherHandle` (must be kept alive) and a tokio mpsc receiver that
/// yields classified `ChangeEvent`s for indexable documents only. `root` should be
/// canonical, since the OS reports canonical paths and keys are computed by stripping
/// `root` from them.
pub fn start_watcher(
    root: &Path,
    extension: &str,
) -> IndexResult<(WatcherHandle, tokio_mpsc::Receiver<ChangeEvent>)> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<notify::Result<Event>>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = std_tx.send(res);
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;

    let (tokio_tx, tokio_rx) = tokio_mpsc::channel::<ChangeEvent>(256);

    // Bridge: spawn_blocking to receive from std channel, classify, forward to tokio
    let root = root.to_path_buf();
    let extension = extension.to_string();
    let bridge_task = tokio::task::spawn_blocking(move || {
        while let Ok(result) = std_rx.recv() {
            match result {
                Ok(event) => {
                    for change in classify_event(&event, &root, &extension) {
                        if tokio_tx.blocking_send(change).is_err() {
                            return; // receiver dropped, shutdown
                        }
                    }
                }
                Err(err) => warn!("watcher error: {err}"),
            }
        }
    });

    Ok((
        WatcherHandle {
            _watcher: watcher,
            _bridge_task: bridge_task,
        },
        tokio_rx,
    ))
}

/// Classify a raw filesystem event into zero or more `ChangeEvent`s.
///
/// A directory that appears under `root` (created or moved in) is scanned and yields a
/// `Created` event for every document inside it. A removal that may have been a
/// directory yields `RemovedTree`, so records beneath it go too. Access and
/// metadata-only events, paths outside `root`, and files without the indexed extension
/// are dropped.
pub fn classify_event(event: &Event, root: &Path, extension: &str) -> Vec<ChangeEvent> {
    if event.need_rescan() {
        warn!("watcher reported lost events; run `search-index build` to resynchronize");
    }

    let paths = &event.paths;
    match &event.kind {
        EventKind::Create(CreateKind::Folder) => paths
            .iter()
            .flat_map(|path| created_tree(path, root, extension))
            .collect(),
        EventKind::Create(_) => paths
            .iter()
            .flat_map(|path| created(path, root, extension))
            .collect(),
        // A file is known not to be a directory, so only documents matter.
        EventKind::Remove(RemoveKind::File) => paths
            .iter()
            .filter(|path| has_indexed_extension(path, extension))
            .filter_map(|path| change(ChangeKind::Removed, path, root))
            .collect(),
        EventKind::Remove(_) => paths
            .iter()
            .filter_map(|path| change(ChangeKind::RemovedTree, path, root))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::new();
            if let Some(from) = paths.first() {
                out.extend(change(ChangeKind::RemovedTree, from, root));
            }
            if let Some(to) = paths.get(1) {
                out.extend(created(to, root, extension));
            }
            out
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => paths
            .iter()
            .filter_map(|path| change(ChangeKind::RemovedTree, path, root))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => paths
            .iter()
            .flat_map(|path| created(path, root, extension))
            .collect(),
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .iter()
            .flat_map(|path| {
                if path.exists() {
                    created(path, root, extension)
                } else {
                    change(ChangeKind::RemovedTree, path, root).into_iter().collect()
                }
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => paths
            .iter()
            .filter(|path| has_indexed_extension(path, extension) && !path.is_dir())
            .filter_map(|path| change(ChangeKind::Modified, path, root))
            .collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// A path that now exists: a document, or a directory whose documents are all new.
fn created(path: &Path, root: &Path, extension: &str) -> Vec<ChangeEvent> {
    if path.is_dir() {
        return created_tree(path, root, extension);
    }
    if !has_indexed_extension(path, extension) {
        return Vec::new();
    }
    change(ChangeKind::Created, path, root).into_iter().collect()
}

fn created_tree(dir: &Path, root: &Path, extension: &str) -> Vec<ChangeEvent> {
    let Ok(prefix) = dir.strip_prefix(root) else {
        return Vec::new();
    };
    // Gone again before it could be scanned; its own removal event follows.
    if !dir.is_dir() {
        return Vec::new();
    }
    match scan_corpus(dir, extension) {
        Ok(files) => files
            .iter()
            .filter_map(|file| record_key(&prefix.join(file)))
            .map(|key| ChangeEvent::new(ChangeKind::Created, key))
            .collect(),
        Err(err) => {
            warn!("skipping new directory {}: {err}", dir.display());
            Vec::new()
        }
    }
}

fn change(kind: ChangeKind, path: &Path, root: &Path) -> Option<ChangeEvent> {
    let key = record_key(path.strip_prefix(root).ok()?)?;
    Some(ChangeEvent::new(kind, key))
}

/// Apply events one at a time until `shutdown` resolves or the event channel closes.
///
/// Each update runs to completion (on the blocking pool, awaited) before the next
/// event is received, so there is never more than one read-modify-write of the
/// artifact in flight, and `shutdown` is only observed between updates. A failed
/// update is logged and the loop keeps going.
pub async fn run_watch_loop<F>(
    config: &IndexerConfig,
    mut events: tokio_mpsc::Receiver<ChangeEvent>,
    shutdown: F,
) -> WatchStats
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut stats = WatchStats::default();

    loop {
        let event = tokio::select! {
            biased;
            () = &mut shutdown => {
                info!("stopping watcher");
                break;
            }
            event = events.recv() => match event {
                Some(event) => event,
                None => {
                    warn!("watch channel closed");
                    break;
                }
            },
        };

        let path = event.path.clone();
        let task_config = config.clone();
        let result = tokio::task::spawn_blocking(move || apply_change(&event, &task_config))
            .await
            .map_err(IndexError::from)
            .and_then(|result| result);

        match result {
            Ok(UpdateOutcome::Upserted) => stats.applied += 1,
            Ok(UpdateOutcome::Removed) => stats.removed += 1,
            Ok(UpdateOutcome::Dropped) => stats.dropped += 1,
            Err(err) => {
                error!("update for {path} failed: {err}");
                stats.failed += 1;
            }
        }
    }

    stats
}

/// Watch `config.root` and keep `config.output` current until Ctrl-C.
///
/// Must only be called once the bulk build has finished, so no update races the
/// baseline write.
pub async fn watch_corpus(config: &IndexerConfig) -> IndexResult<WatchStats> {
    let root = std::fs::canonicalize(&config.root).map_err(|source| IndexError::Root {
        path: config.root.clone(),
        source,
    })?;
    let (handle, events) = start_watcher(&root, &config.extension)?;
    info!("watching {} for changes (Ctrl-C to stop)", root.display());

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    let stats = run_watch_loop(config, events, shutdown).await;
    drop(handle);
    Ok(stats)
}
