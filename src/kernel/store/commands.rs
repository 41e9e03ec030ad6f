use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::kernel::services::ports::ScanKind;
use crate::kernel::{Action, Effect};
use crate::models::entry::entry_name;
use crate::models::{is_valid_name, NodeId, TreeError};

impl super::Store {
    pub(super) fn open_root(
        &mut self,
        path: PathBuf,
        activate: bool,
        result: &mut super::DispatchResult,
    ) {
        let root = match self.tree.open_root(&path) {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "open project rejected");
                result.warn(e.to_string());
                result.error = Some(e);
                return;
            }
        };
        let Some(root_path) = self.tree.path_of(root).map(Path::to_path_buf) else {
            return;
        };
        tracing::info!(root = %root_path.display(), "project opened");

        result.effects.push(Effect::Watch(root_path));
        self.start_scan(root, ScanKind::Populate, result);
        result.tree_changed(Some(root));
        if activate || self.overlay.active().is_none() {
            let notice = self.overlay.activate(&self.tree, root);
            result.notice(notice);
        }
    }

    pub(super) fn close_root(&mut self, root: NodeId, result: &mut super::DispatchResult) {
        if !self.tree.is_root(root) {
            tracing::debug!(?root, "close of stale or non-root handle");
            return;
        }
        self.destroy_root(root, result);
    }

    /// Renames in the tree first so the node keeps its identity, then asks for
    /// the on-disk rename. The watch echo resolves to a no-op.
    ///
    /// While the root is populating, staged entries still carry the old
    /// paths, so the rename waits for the batch to flush.
    pub(super) fn rename(
        &mut self,
        node: NodeId,
        new_name: OsString,
        result: &mut super::DispatchResult,
    ) {
        let Some(from) = self.tree.path_of(node).map(Path::to_path_buf) else {
            tracing::debug!(?node, "rename of stale handle");
            return;
        };
        if !is_valid_name(&new_name) {
            let e = TreeError::InvalidName(new_name);
            tracing::warn!(path = %from.display(), error = %e, "rename rejected");
            result.warn(e.to_string());
            result.error = Some(e);
            return;
        }
        if let Some(root) = self.tree.root_of(node).filter(|&r| self.batches.is_open(r)) {
            tracing::debug!(path = %from.display(), "rename held until the scan batch flushes");
            self.batches.defer(root, Action::Rename { node, new_name });
            return;
        }
        match self.tree.rename(node, new_name) {
            Ok(()) => {
                let Some(to) = self.tree.path_of(node).map(Path::to_path_buf) else {
                    return;
                };
                if to != from {
                    result.effects.push(Effect::RenamePath { from, to });
                    result.tree_changed(self.tree.root_of(node));
                }
            }
            Err(e) => {
                if e.is_structural() {
                    if let Some(parent) = from.parent() {
                        self.recover_structural(&e, parent, result);
                    }
                } else {
                    tracing::warn!(path = %from.display(), error = %e, "rename rejected");
                    result.warn(e.to_string());
                }
                result.error = Some(e);
            }
        }
    }

    pub(super) fn reduce_rename_failed(
        &mut self,
        from: &Path,
        to: &Path,
        error: String,
        result: &mut super::DispatchResult,
    ) {
        tracing::warn!(from = %from.display(), to = %to.display(), error = %error, "rename on disk failed");
        result.warn(format!(
            "could not rename {} to {}: {error}",
            from.display(),
            to.display()
        ));
        let Some(node) = self.tree.lookup(to) else {
            return;
        };
        if self.tree.lookup(from).is_some() {
            return;
        }
        let old_name = entry_name(from);
        if let Err(e) = self.tree.rename(node, old_name) {
            if let Some(parent) = from.parent() {
                self.recover_structural(&e, parent, result);
            }
            return;
        }
        result.tree_changed(self.tree.root_of(node));
    }

    pub(super) fn select_by_path(&mut self, path: &Path, result: &mut super::DispatchResult) {
        match self.tree.lookup(path) {
            Some(node) => {
                let notice = self.overlay.select(Some(node));
                result.notice(notice);
            }
            None => tracing::debug!(path = %path.display(), "select of unknown path"),
        }
    }
}
