//! File system watch on the certificate and key.

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// The two files whose changes should trigger a reload.
#[derive(Debug, Clone)]
pub struct WatchTargets {
    cert: PathBuf,
    key: PathBuf,
    /// Configured paths plus their canonical-directory forms, as notify
    /// may report either.
    candidates: Vec<PathBuf>,
}

impl WatchTargets {
    pub fn new(cert: &Path, key: &Path) -> Self {
        let mut candidates = Vec::with_capacity(6);
        for path in [cert, key] {
            let Some(name) = path.file_name() else {
                candidates.push(path.to_path_buf());
                continue;
            };
            let dir = watch_dir(path);
            let mut forms = vec![path.to_path_buf(), dir.join(name)];
            if let Ok(canonical) = dir.canonicalize() {
                forms.push(canonical.join(name));
            }
            for form in forms {
                if !candidates.contains(&form) {
                    candidates.push(form);
                }
            }
        }
        Self {
            cert: cert.to_path_buf(),
            key: key.to_path_buf(),
            candidates,
        }
    }

    /// True for create/modify events that touch the cert or key.
    ///
    /// Metadata-only changes, reads and removals are ignored.
    pub fn is_relevant(&self, event: &Event) -> bool {
        let change = match &event.kind {
            EventKind::Create(_) => true,
            EventKind::Modify(ModifyKind::Metadata(_)) => false,
            EventKind::Modify(_) => true,
            _ => false,
        };
        change
            && event
                .paths
                .iter()
                .any(|p| self.candidates.iter().any(|c| c == p))
    }

    /// Directories to watch. Watching the parent keeps rename-replaced files visible.
    fn dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![watch_dir(&self.cert).to_path_buf()];
        let key_dir = watch_dir(&self.key).to_path_buf();
        if !dirs.contains(&key_dir) {
            dirs.push(key_dir);
        }
        dirs
    }
}

fn watch_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Event and error feeds consumed by the agent loop.
///
/// Holds the underlying watcher; dropping this stops watching.
pub struct WatchEvents {
    pub(crate) events: mpsc::UnboundedReceiver<Event>,
    pub(crate) errors: mpsc::UnboundedReceiver<notify::Error>,
    _watcher: Option<RecommendedWatcher>,
}

impl WatchEvents {
    /// Start watching the directories holding the targets.
    pub fn start(targets: &WatchTargets) -> Result<Self, notify::Error> {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (errors_tx, errors) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let _ = events_tx.send(event);
                }
                Err(e) => {
                    let _ = errors_tx.send(e);
                }
            },
            Config::default(),
        )?;

        for dir in targets.dirs() {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            tracing::debug!(dir = %dir.display(), "Watching directory");
        }

        tracing::info!(
            cert = %targets.cert.display(),
            key = %targets.key.display(),
            "Certificate watcher started"
        );

        Ok(Self {
            events,
            errors,
            _watcher: Some(watcher),
        })
    }

    /// Feed the agent from caller-owned channels instead of a real watcher.
    pub fn from_channels(
        events: mpsc::UnboundedReceiver<Event>,
        errors: mpsc::UnboundedReceiver<notify::Error>,
    ) -> Self {
        Self {
            events,
            errors,
            _watcher: None,
        }
    }
}
