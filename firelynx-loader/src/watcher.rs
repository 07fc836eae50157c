use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Watches a config file's parent directory for changes and wakes a
/// [`tokio::sync::Notify`] whenever the file itself is touched. Watching the
/// directory rather than the file handles editors that write via
/// rename-into-place, which `notify` would otherwise lose track of.
///
/// Bursts of filesystem events collapse into a single wake: `Notify::
/// notify_one` is idempotent while unconsumed, so several rapid writes
/// before the core runner gets around to `notified().await` still produce
/// exactly one reload, not one per event.
pub struct ConfigWatcher {
    _inner: RecommendedWatcher,
}

impl ConfigWatcher {
    pub fn watch(path: &Path, on_change: Arc<Notify>) -> notify::Result<Self> {
        let target = path.to_path_buf();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_))
                    && event.paths.iter().any(|p| p == &target)
                {
                    debug!(path = ?target, "config file changed");
                    on_change.notify_one();
                }
            }
            Err(err) => warn!(error = %err, "config watcher error"),
        })?;

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        watcher.watch(parent, RecursiveMode::NonRecursive)?;

        Ok(Self { _inner: watcher })
    }
}
