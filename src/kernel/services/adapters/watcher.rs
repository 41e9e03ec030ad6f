use crate::kernel::services::ports::FsNotification;
use crate::models::{EntryKind, PathFilter, StableId};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Only directories are ever watched: one recursive watch per project root.
pub struct WatchPolicy;

impl WatchPolicy {
    pub fn is_directory(path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FsDelta {
    Created { path: PathBuf },
    Deleted { path: PathBuf },
    Renamed { from: PathBuf, to: PathBuf },
    Modified { path: PathBuf },
}

pub struct WatchService {
    watcher: RecommendedWatcher,
    raw_event_rx: mpsc::Receiver<notify::Event>,
    roots: Vec<PathBuf>,
    filter: PathFilter,
}

impl WatchService {
    pub fn new(poll_interval: Duration, filter: PathFilter) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                let Ok(event) = res else { return };
                let _ = tx.send(event);
            },
            Config::default().with_poll_interval(poll_interval),
        )?;
        Ok(Self {
            watcher,
            raw_event_rx: rx,
            roots: Vec::new(),
            filter,
        })
    }

    /// `Ok(false)` when `root` is not a directory or is already watched.
    pub fn watch(&mut self, root: &Path) -> Result<bool, notify::Error> {
        if !WatchPolicy::is_directory(root) || self.roots.iter().any(|r| r == root) {
            return Ok(false);
        }
        self.watcher.watch(root, RecursiveMode::Recursive)?;
        self.roots.push(root.to_path_buf());
        tracing::debug!(root = %root.display(), "watch installed");
        Ok(true)
    }

    pub fn unwatch(&mut self, root: &Path) {
        let Some(pos) = self.roots.iter().position(|r| r == root) else {
            return;
        };
        self.roots.remove(pos);
        if let Err(e) = self.watcher.unwatch(root) {
            tracing::debug!(root = %root.display(), error = %e, "unwatch failed");
        }
    }

    pub fn watched_roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn drain_events(&mut self) -> Vec<FsNotification> {
        let mut events = Vec::new();
        while let Ok(event) = self.raw_event_rx.try_recv() {
            for delta in normalize_notify_event(event) {
                if let Some(notification) = self.route_delta(delta) {
                    events.push(notification);
                }
            }
        }
        events
    }

    fn route_delta(&self, delta: FsDelta) -> Option<FsNotification> {
        match delta {
            FsDelta::Created { path } => {
                let root = self.locate(&path)?;
                Some(with_identity(FsNotification::created(root, path)))
            }
            FsDelta::Deleted { path } => {
                let root = self.locate(&path)?;
                Some(FsNotification::removed(root, path))
            }
            FsDelta::Modified { path } => {
                let root = self.locate(&path)?;
                Some(FsNotification::stat_changed(root, path))
            }
            FsDelta::Renamed { from, to } => match (self.locate(&from), self.locate(&to)) {
                (Some(root), Some(_)) => Some(with_identity(FsNotification::moved(root, from, to))),
                (Some(root), None) => Some(FsNotification::removed(root, from)),
                (None, Some(root)) => Some(with_identity(FsNotification::created(root, to))),
                (None, None) => None,
            },
        }
    }

    /// The watched root containing `path`, unless the path is filtered out.
    fn locate(&self, path: &Path) -> Option<&Path> {
        let root = self
            .roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())?;
        if path == root.as_path() {
            return Some(root.as_path());
        }
        let is_dir = WatchPolicy::is_directory(path);
        if self.filter.is_ignored_under(root, path, is_dir) {
            return None;
        }
        Some(root.as_path())
    }
}

fn with_identity(notification: FsNotification) -> FsNotification {
    match std::fs::symlink_metadata(&notification.path) {
        Ok(meta) => {
            let kind = if meta.is_dir() {
                EntryKind::Folder
            } else {
                EntryKind::File
            };
            let stable_id = StableId::from_metadata(&notification.path, &meta);
            notification.with_identity(stable_id, kind)
        }
        Err(_) => notification,
    }
}

fn normalize_notify_event(event: notify::Event) -> Vec<FsDelta> {
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .into_iter()
            .map(|path| FsDelta::Created { path })
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .into_iter()
            .map(|path| FsDelta::Deleted { path })
            .collect(),
        EventKind::Modify(kind) => normalize_modify_event(kind, event.paths),
        _ => Vec::new(),
    }
}

fn normalize_modify_event(kind: ModifyKind, paths: Vec<PathBuf>) -> Vec<FsDelta> {
    match kind {
        ModifyKind::Name(RenameMode::Both) => {
            let mut paths = paths.into_iter();
            match (paths.next(), paths.next()) {
                (Some(from), Some(to)) => vec![FsDelta::Renamed { from, to }],
                (Some(path), None) => vec![FsDelta::Modified { path }],
                _ => Vec::new(),
            }
        }
        ModifyKind::Name(RenameMode::From) => paths
            .into_iter()
            .map(|path| FsDelta::Deleted { path })
            .collect(),
        ModifyKind::Name(RenameMode::To) => paths
            .into_iter()
            .map(|path| FsDelta::Created { path })
            .collect(),
        // Ambiguous rename halves: existence decides.
        ModifyKind::Name(_) => paths
            .into_iter()
            .map(|path| {
                if std::fs::symlink_metadata(&path).is_ok() {
                    FsDelta::Created { path }
                } else {
                    FsDelta::Deleted { path }
                }
            })
            .collect(),
        ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other | ModifyKind::Metadata(_) => {
            paths
                .into_iter()
                .map(|path| FsDelta::Modified { path })
                .collect()
        }
    }
}
