use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};

use crate::logging;

/// Watches the directory of an open document and reports changes to that file.
pub struct DocumentWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

/// Events emitted by [`DocumentWatcher`].
#[derive(Debug)]
pub enum DocumentEvent {
    /// The watched file was created, modified or removed.
    Changed { path: PathBuf, timestamp: SystemTime },
    /// An error reported by the underlying watcher.
    Error { error: notify::Error },
}

impl DocumentWatcher {
    pub fn new(
        path: PathBuf,
        mut handler: impl FnMut(DocumentEvent) + Send + 'static,
    ) -> Result<Self> {
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let target = path.clone();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            match event {
                Ok(event) if touches(&event, &target) => handler(DocumentEvent::Changed {
                    path: target.clone(),
                    timestamp: SystemTime::now(),
                }),
                Ok(_) => {}
                Err(error) => handler(DocumentEvent::Error { error }),
            }
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {dir:?}"))?;

        logging::with_workbench_subscriber(|| {
            tracing::debug!(target: "workbench.watcher", path = %path.display(), "Watching document");
        });

        Ok(Self {
            path,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn touches(event: &Event, target: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    ) && event
        .paths
        .iter()
        .any(|path| path.file_name() == target.file_name())
}
