use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

use super::batch::BatchAccumulator;
use super::overlay::Overlay;
use super::services::ports::{ScanKind, TreeConfig};
use super::sync::PendingRemovals;
use super::{Action, Effect, Notice};
use crate::models::{NodeId, PathFilter, ProjectTree, StableId, TreeError};

mod commands;
mod fs_events;
mod scan;

#[derive(Debug, Default)]
pub struct DispatchResult {
    pub effects: Vec<Effect>,
    pub notices: Vec<Notice>,
    pub state_changed: bool,
    /// Set when a command was rejected; a matching `Notice::Warning` is also
    /// in `notices`.
    pub error: Option<TreeError>,
}

impl DispatchResult {
    fn tree_changed(&mut self, root: Option<NodeId>) {
        self.state_changed = true;
        if let Some(root) = root {
            let notice = Notice::TreeChanged(root);
            if !self.notices.contains(&notice) {
                self.notices.push(notice);
            }
        }
    }

    fn notice(&mut self, notice: Option<Notice>) {
        if let Some(notice) = notice {
            self.state_changed = true;
            self.notices.push(notice);
        }
    }

    fn warn(&mut self, message: String) {
        self.notices.push(Notice::Warning(message));
    }
}

/// Single writer over the tree, its batches, the pending removals and the
/// overlay. Every change goes through [`Store::dispatch`].
pub struct Store {
    tree: ProjectTree,
    overlay: Overlay,
    batches: BatchAccumulator,
    pending: PendingRemovals,
    config: TreeConfig,
    filter: PathFilter,
    watch_warned: FxHashSet<PathBuf>,
}

impl Store {
    pub fn new(config: TreeConfig) -> Self {
        let filter = config.path_filter().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid exclude pattern, using built-in ignores only");
            PathFilter::builtin_only(config.ignore_builtin)
        });
        Self {
            tree: ProjectTree::new(config.case_sensitive_sort),
            overlay: Overlay::default(),
            batches: BatchAccumulator::default(),
            pending: PendingRemovals::default(),
            config,
            filter,
            watch_warned: FxHashSet::default(),
        }
    }

    pub fn tree(&self) -> &ProjectTree {
        &self.tree
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    pub fn is_batch_open(&self, root: NodeId) -> bool {
        self.batches.is_open(root)
    }

    pub fn is_pending_removal(&self, node: NodeId) -> bool {
        self.pending.is_pending(node)
    }

    pub fn check_invariants(&self) -> Result<(), String> {
        self.tree.check_invariants()?;
        self.overlay.check_invariants(&self.tree)
    }

    pub fn dispatch(&mut self, action: Action) -> DispatchResult {
        let mut result = DispatchResult::default();
        self.apply(action, &mut result);
        result
    }

    fn apply(&mut self, action: Action, result: &mut DispatchResult) {
        match action {
            Action::OpenRoot { path, activate } => self.open_root(path, activate, result),
            Action::CloseRoot(root) => self.close_root(root, result),
            Action::Activate(root) => {
                let notice = self.overlay.activate(&self.tree, root);
                result.notice(notice);
            }
            Action::Rename { node, new_name } => self.rename(node, new_name, result),
            Action::SelectByPath(path) => self.select_by_path(&path, result),
            Action::SetOverlay { path, flag, value } => {
                match self.tree.lookup(&path).and_then(|n| self.tree.stable_id(n)) {
                    Some(stable_id) => {
                        let notice = self.overlay.set_flag(stable_id, flag, value);
                        result.notice(notice);
                    }
                    None => tracing::debug!(path = %path.display(), "overlay for unknown path"),
                }
            }
            Action::Rescan(path) => match self.tree.lookup(&path) {
                Some(dir) if self.tree.is_dir(dir) => self.request_rescan(dir, result),
                _ => tracing::debug!(path = %path.display(), "rescan of unknown directory"),
            },
            Action::Fs { event, at } => self.reduce_fs_event(event, at, result),
            Action::Tick { now } => self.reduce_tick(now, result),
            Action::ScanChunk {
                root,
                scan,
                entries,
            } => self.reduce_scan_chunk(root, scan, entries, result),
            Action::ScanFinished { root, scan, error } => {
                self.reduce_scan_finished(root, scan, error, result)
            }
            Action::WatchFailed { root, error } => {
                tracing::warn!(root = %root.display(), error = %error, "watch install failed");
                if self.watch_warned.insert(root.clone()) {
                    result.warn(format!(
                        "{} is not being watched, changes on disk will not show up: {error}",
                        root.display()
                    ));
                }
            }
            Action::RenameFailed { from, to, error } => {
                self.reduce_rename_failed(&from, &to, error, result)
            }
        }
    }

    /// Opens a populate or rescan batch for `dir` and asks for the scan.
    fn start_scan(&mut self, dir: NodeId, kind: ScanKind, result: &mut DispatchResult) {
        let (Some(root), Some(dir_path)) = (self.tree.root_of(dir), self.tree.path_of(dir)) else {
            return;
        };
        let dir_path = dir_path.to_path_buf();
        let Some(root_path) = self.tree.path_of(root).map(Path::to_path_buf) else {
            return;
        };
        let scan = self.batches.begin(root, dir_path.clone(), kind);
        tracing::debug!(dir = %dir_path.display(), ?kind, scan = scan.0, "scan requested");
        result.effects.push(Effect::StartScan {
            root,
            scan,
            root_path,
            dir: dir_path,
        });
    }

    fn request_rescan(&mut self, dir: NodeId, result: &mut DispatchResult) {
        self.start_scan(dir, ScanKind::Rescan, result);
    }

    /// Handles a rejected structural change: the event is dropped and the
    /// directory it concerned is re-listed.
    fn recover_structural(&mut self, error: &TreeError, dir: &Path, result: &mut DispatchResult) {
        tracing::warn!(error = %error, dir = %dir.display(), "structural conflict, rescanning");
        result.warn(error.to_string());
        if let Some(dir) = self.tree.lookup(dir).filter(|&d| self.tree.is_dir(d)) {
            self.request_rescan(dir, result);
        }
    }

    /// Destroys `node` and its subtree, keeping overlay and pending state in
    /// step. Roots are closed and unwatched.
    fn destroy_node(&mut self, node: NodeId, result: &mut DispatchResult) {
        if self.tree.is_root(node) {
            self.destroy_root(node, result);
            return;
        }
        let root = self.tree.root_of(node);
        let notice = self.overlay.on_destroying(&self.tree, node);
        result.notice(notice);
        match self.tree.remove(node) {
            Ok(removed) => {
                self.forget(&removed);
                result.tree_changed(root);
            }
            Err(e) => tracing::debug!(error = %e, "destroy of stale node"),
        }
    }

    fn destroy_root(&mut self, root: NodeId, result: &mut DispatchResult) {
        let Some(path) = self.tree.path_of(root).map(Path::to_path_buf) else {
            return;
        };
        for scan in self.batches.cancel_root(root) {
            result.effects.push(Effect::CancelScan(scan));
        }
        let notice = self.overlay.on_destroying(&self.tree, root);
        result.notice(notice);
        let removed = self.tree.close_root(root);
        self.forget(&removed);
        let notice = self.overlay.on_root_closed(&self.tree, root);
        result.notice(notice);
        result.effects.push(Effect::Unwatch(path.clone()));
        result.tree_changed(Some(root));
        tracing::info!(root = %path.display(), nodes = removed.len(), "project closed");
    }

    fn forget(&mut self, removed: &[StableId]) {
        self.overlay.drop_flags(removed);
        self.pending.forget(removed, &self.tree);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/store.rs"]
mod tests;
