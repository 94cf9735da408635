use crate::run::{evaluate_images, local_source};
use app_state::AppSettings;
use color_eyre::eyre::Result;
use common_services::source::{LocalFolderSource, read_image_file};
use language_model::Evaluator;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// New image files seen by the watcher that have not been evaluated yet.
#[derive(Debug)]
pub struct PendingFiles {
    source: LocalFolderSource,
    /// Size at the last observation, `None` if it could not be read yet.
    pending: BTreeMap<PathBuf, Option<u64>>,
    /// Paths already evaluated by this process.
    seen: HashSet<PathBuf>,
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|s| s.starts_with('.'))
}

fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(std::fs::Metadata::is_file)
        .map(|m| m.len())
}

impl PendingFiles {
    #[must_use]
    pub fn new(source: LocalFolderSource, seen: HashSet<PathBuf>) -> Self {
        Self {
            source,
            pending: BTreeMap::new(),
            seen,
        }
    }

    /// Queues the paths of create and rename events. Returns how many were queued.
    pub fn record(&mut self, event: &Event) -> usize {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))
        ) {
            return 0;
        }

        let mut queued = 0;
        for path in &event.paths {
            if is_hidden(path) {
                debug!("Ignoring hidden file event for: {:?}", path);
                continue;
            }
            if !self.source.is_supported(path)
                || self.seen.contains(path)
                || self.pending.contains_key(path)
            {
                continue;
            }
            self.pending.insert(path.clone(), file_size(path));
            queued += 1;
        }
        queued
    }

    /// Drains pending files whose size did not change since the last observation and
    /// marks them seen. Files still growing stay pending; vanished files are dropped.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        let mut ready = Vec::new();
        let mut still_pending = BTreeMap::new();
        for (path, last_size) in std::mem::take(&mut self.pending) {
            if !path.is_file() {
                debug!("{} is no longer a file, skipping", path.display());
                continue;
            }
            let size = file_size(&path);
            if size.is_some() && size == last_size {
                ready.push(path);
            } else {
                still_pending.insert(path, size);
            }
        }
        self.pending = still_pending;
        self.seen.extend(ready.iter().cloned());
        ready
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Watches the local image folder and evaluates new images every watch interval,
/// until ctrl-c. Paths in `seen` are never evaluated again.
pub async fn watch_folder(
    settings: &AppSettings,
    evaluator: Arc<dyn Evaluator>,
    seen: HashSet<PathBuf>,
) -> Result<()> {
    let source = local_source(settings);
    let folder = source.root().to_path_buf();
    let (tx, mut rx) = mpsc::channel(100);

    let mut watcher = RecommendedWatcher::new(
        move |res| {
            if let Err(e) = tx.blocking_send(res) {
                error!("Failed to send event through channel: {}", e);
            }
        },
        Config::default(),
    )?;
    watcher.watch(&folder, RecursiveMode::Recursive)?;
    info!(
        "👁️ Watcher started on: {}, evaluating new images every {:?}",
        folder.display(),
        settings.watch.interval
    );

    let mut pending = PendingFiles::new(source, seen);
    let mut ticker = tokio::time::interval(settings.watch.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(Ok(event)) => {
                    pending.record(&event);
                }
                Some(Err(err)) => error!("Watch error: {:?}", err),
                None => break,
            },
            _ = ticker.tick() => {
                let paths = pending.take_ready();
                if !paths.is_empty() {
                    evaluate_new_files(settings, evaluator.clone(), &folder, paths).await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watcher, {} new images were not evaluated", pending.len());
                break;
            }
        }
    }

    Ok(())
}

/// Failures are logged; the watcher keeps running.
async fn evaluate_new_files(
    settings: &AppSettings,
    evaluator: Arc<dyn Evaluator>,
    folder: &Path,
    paths: Vec<PathBuf>,
) {
    info!("📥 {} new images to evaluate", paths.len());
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        match read_image_file(&path).await {
            Ok(image) => images.push(image),
            Err(e) => warn!("Could not read {}: {}", path.display(), e),
        }
    }
    if images.is_empty() {
        return;
    }

    let source = folder.display().to_string();
    if let Err(e) = evaluate_images(settings, evaluator, images, source).await {
        error!("Evaluating new images failed: {:?}", e);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};
    use std::fs;

    fn pending_in(dir: &Path, seen: HashSet<PathBuf>) -> PendingFiles {
        let source = LocalFolderSource::with_root(dir)
            .extensions(vec!["jpg".to_string(), "png".to_string()])
            .build();
        PendingFiles::new(source, seen)
    }

    fn create(path: &Path) -> Event {
        Event::new(EventKind::Create(CreateKind::File)).add_path(path.to_path_buf())
    }

    #[test]
    fn queues_new_supported_files_once() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("IMG_001.JPG");
        fs::write(&photo, b"jpeg").unwrap();

        let mut pending = pending_in(dir.path(), HashSet::new());
        assert_eq!(pending.record(&create(&photo)), 1);
        assert_eq!(pending.record(&create(&photo)), 0);
        assert_eq!(pending.take_ready(), vec![photo.clone()]);

        // Evaluated paths are not queued again.
        assert_eq!(pending.record(&create(&photo)), 0);
        assert!(pending.is_empty());
    }

    #[test]
    fn skips_hidden_unsupported_and_seen_files() {
        let dir = tempfile::tempdir().unwrap();
        let seen_photo = dir.path().join("old.png");
        let mut pending = pending_in(dir.path(), HashSet::from([seen_photo.clone()]));

        assert_eq!(pending.record(&create(&dir.path().join(".partial.jpg"))), 0);
        assert_eq!(pending.record(&create(&dir.path().join("notes.txt"))), 0);
        assert_eq!(pending.record(&create(&seen_photo)), 0);
        assert!(pending.is_empty());
    }

    #[test]
    fn only_creates_and_renames_count() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("a.png");
        let mut pending = pending_in(dir.path(), HashSet::new());

        let modified = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(photo.clone());
        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(photo.clone());
        assert_eq!(pending.record(&modified), 0);
        assert_eq!(pending.record(&removed), 0);

        let renamed = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(photo.clone());
        assert_eq!(pending.record(&renamed), 1);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn vanished_files_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.jpg");
        let gone = dir.path().join("gone.jpg");
        fs::write(&kept, b"jpeg").unwrap();

        let mut pending = pending_in(dir.path(), HashSet::new());
        pending.record(&create(&kept));
        pending.record(&create(&gone));
        assert_eq!(pending.take_ready(), vec![kept]);
        assert!(pending.is_empty());
    }

    #[test]
    fn growing_files_wait_until_their_size_settles() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("upload.jpg");
        fs::write(&photo, b"jp").unwrap();

        let mut pending = pending_in(dir.path(), HashSet::new());
        pending.record(&create(&photo));
        fs::write(&photo, b"jpeg, still copying").unwrap();

        assert!(pending.take_ready().is_empty());
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.take_ready(), vec![photo.clone()]);
        assert!(pending.is_empty());
    }
}
