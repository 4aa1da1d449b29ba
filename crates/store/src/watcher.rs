use crate::error::{Error, Result};

use notify::{Event, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillFileEvent {
    Changed(PathBuf),
    Removed(PathBuf),
}

impl SkillFileEvent {
    pub fn path(&self) -> &Path {
        match self {
            SkillFileEvent::Changed(path) | SkillFileEvent::Removed(path) => path,
        }
    }
}

/// Emits an event whenever the skill file is created, modified or removed.
///
/// Watches the containing directory so atomic replacements (temp file then
/// rename) are still seen.
pub struct ConfigWatcher {
    _watcher: Box<dyn Watcher + Send + Sync>,
    event_tx: broadcast::Sender<SkillFileEvent>,
    path: PathBuf,
}

impl ConfigWatcher {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| Error::watcher(format!("{} has no file name", path.display())))?
            .to_os_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let (event_tx, _) = broadcast::channel(16);
        let tx = event_tx.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else { return };
            if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
                return;
            }
            for changed in event.paths.iter().filter(|p| p.file_name() == Some(file_name.as_os_str())) {
                let file_event = if event.kind.is_remove() {
                    SkillFileEvent::Removed(changed.clone())
                } else {
                    SkillFileEvent::Changed(changed.clone())
                };
                let _ = tx.send(file_event);
            }
        })
        .map_err(|e| Error::watcher(e.to_string()))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::watcher(e.to_string()))?;

        tracing::debug!(path = %path.display(), "watching skill file");
        Ok(Self { _watcher: Box::new(watcher), event_tx, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SkillFileEvent> {
        self.event_tx.subscribe()
    }
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher").field("path", &self.path).finish()
    }
}
