use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::kernel::services::ports::{FsNotification, FsOpcode, ScanKind};
use crate::kernel::{Action, Effect, Notice};
use crate::models::entry::entry_name;
use crate::models::{Entry, EntryKind, NodeId, StableId};

impl super::Store {
    pub(super) fn reduce_fs_event(
        &mut self,
        event: FsNotification,
        at: Instant,
        result: &mut super::DispatchResult,
    ) {
        let Some(root) = self.tree.lookup(&event.watched_root).filter(|&r| self.tree.is_root(r))
        else {
            tracing::debug!(root = %event.watched_root.display(), "event for a root that is not open");
            return;
        };
        if self.batches.is_open(root) {
            self.batches.defer(root, Action::Fs { event, at });
            return;
        }
        self.apply_fs_event(event, at, result);
    }

    fn apply_fs_event(&mut self, event: FsNotification, at: Instant, result: &mut super::DispatchResult) {
        match event.opcode {
            FsOpcode::Created => self.apply_created(&event.path, event.stable_id, event.kind, result),
            FsOpcode::Removed => self.apply_removed(&event.path, at, result),
            FsOpcode::Moved => match event.old_path {
                Some(old_path) => {
                    self.apply_moved(&old_path, &event.path, event.stable_id, event.kind, at, result)
                }
                None => self.apply_created(&event.path, event.stable_id, event.kind, result),
            },
            FsOpcode::StatChanged => result.notices.push(Notice::StatChanged(event.path)),
        }
    }

    /// The object now at `path`, from the notification when it carried its
    /// identity, otherwise from the filesystem.
    fn resolve_entry(
        path: &Path,
        stable_id: Option<StableId>,
        kind: Option<EntryKind>,
    ) -> Option<Entry> {
        if let (Some(stable_id), Some(kind)) = (stable_id, kind) {
            return Some(Entry::new(kind, path.to_path_buf(), stable_id));
        }
        match Entry::probe(path) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "created path vanished");
                None
            }
        }
    }

    fn is_filtered(&self, parent: NodeId, entry: &Entry) -> bool {
        let Some(root_path) = self.tree.root_of(parent).and_then(|r| self.tree.path_of(r)) else {
            return true;
        };
        self.filter
            .is_ignored_under(root_path, &entry.absolute_path, entry.is_dir())
    }

    fn apply_created(
        &mut self,
        path: &Path,
        stable_id: Option<StableId>,
        kind: Option<EntryKind>,
        result: &mut super::DispatchResult,
    ) {
        let Some(parent) = path
            .parent()
            .and_then(|p| self.tree.lookup(p))
            .filter(|&p| self.tree.is_dir(p))
        else {
            tracing::debug!(path = %path.display(), "create under unknown parent discarded");
            return;
        };
        let Some(entry) = Self::resolve_entry(path, stable_id, kind) else {
            return;
        };
        if self.is_filtered(parent, &entry) {
            return;
        }

        if let Some(existing) = self.tree.lookup(path) {
            if self.tree.stable_id(existing) == Some(entry.stable_id) {
                self.pending.cancel(existing);
                return;
            }
            tracing::debug!(path = %path.display(), "object replaced at path");
            self.destroy_node(existing, result);
        }

        if let Some(pending) = self.pending.take(entry.stable_id) {
            if self.tree.stable_id(pending.node) == Some(entry.stable_id)
                && self.resolve_pending_as_move(pending.node, parent, path, result)
            {
                return;
            }
        }

        let root = self.tree.root_of(parent);
        let is_dir = entry.is_dir();
        match self.tree.add_under(parent, entry) {
            Ok(node) => {
                result.tree_changed(root);
                if is_dir {
                    self.start_scan(node, ScanKind::Populate, result);
                }
            }
            Err(e) if e.is_structural() => {
                if let Some(dir) = path.parent() {
                    self.recover_structural(&e, dir, result);
                }
            }
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "create discarded"),
        }
    }

    /// Carries a node that was removed inside the grace window over to where
    /// it reappeared. False when the caller must add a fresh node instead.
    fn resolve_pending_as_move(
        &mut self,
        node: NodeId,
        new_parent: NodeId,
        new_path: &Path,
        result: &mut super::DispatchResult,
    ) -> bool {
        if self.tree.is_root(node) {
            let root_path = self.tree.path_of(node).map(Path::to_path_buf);
            self.destroy_node(node, result);
            if let Some(root_path) = root_path {
                result.notices.push(Notice::RootLost {
                    root_path,
                    new_path: Some(new_path.to_path_buf()),
                });
            }
            return false;
        }

        let old_root = self.tree.root_of(node);
        match self.tree.reparent(node, new_parent, entry_name(new_path)) {
            Ok(()) => {
                tracing::debug!(path = %new_path.display(), "pending removal resolved as move");
                result.tree_changed(old_root);
                result.tree_changed(self.tree.root_of(node));
                true
            }
            Err(e) => {
                tracing::warn!(path = %new_path.display(), error = %e, "pending removal could not be moved");
                self.destroy_node(node, result);
                false
            }
        }
    }

    fn apply_removed(&mut self, path: &Path, at: Instant, result: &mut super::DispatchResult) {
        let Some(node) = self.tree.lookup(path) else {
            tracing::debug!(path = %path.display(), "remove of unknown path discarded");
            return;
        };
        let Some(stable_id) = self.tree.stable_id(node) else {
            return;
        };
        let grace = self.config.grace_window();
        self.pending.mark(stable_id, node, at + grace);
        result.effects.push(Effect::ScheduleTick { after: grace });
    }

    fn apply_moved(
        &mut self,
        old_path: &Path,
        new_path: &Path,
        stable_id: Option<StableId>,
        kind: Option<EntryKind>,
        at: Instant,
        result: &mut super::DispatchResult,
    ) {
        let Some(node) = self.tree.lookup(old_path) else {
            self.apply_created(new_path, stable_id, kind, result);
            return;
        };
        self.pending.cancel(node);

        if self.tree.is_root(node) {
            self.destroy_root(node, result);
            result.notices.push(Notice::RootLost {
                root_path: old_path.to_path_buf(),
                new_path: Some(new_path.to_path_buf()),
            });
            return;
        }

        let new_parent = new_path
            .parent()
            .and_then(|p| self.tree.lookup(p))
            .filter(|&p| self.tree.is_dir(p));
        let Some(new_parent) = new_parent else {
            tracing::debug!(from = %old_path.display(), to = %new_path.display(), "moved out of every project");
            self.apply_removed(old_path, at, result);
            return;
        };
        let moved_dir = self.tree.is_dir(node);
        let ignored = self.tree.root_of(new_parent).and_then(|r| self.tree.path_of(r)).is_some_and(
            |root_path| self.filter.is_ignored_under(root_path, new_path, moved_dir),
        );
        if ignored {
            self.apply_removed(old_path, at, result);
            return;
        }

        // rename(2) replaces whatever was at the destination.
        if let Some(existing) = self.tree.lookup(new_path).filter(|&e| e != node) {
            self.destroy_node(existing, result);
        }

        let old_root = self.tree.root_of(node);
        match self.tree.reparent(node, new_parent, entry_name(new_path)) {
            Ok(()) => {
                result.tree_changed(old_root);
                result.tree_changed(self.tree.root_of(node));
            }
            Err(e) if e.is_structural() => {
                if let Some(dir) = new_path.parent() {
                    self.recover_structural(&e, dir, result);
                }
            }
            Err(e) => {
                tracing::warn!(from = %old_path.display(), to = %new_path.display(), error = %e, "move rejected");
                result.warn(e.to_string());
            }
        }
    }

    pub(super) fn reduce_tick(&mut self, now: Instant, result: &mut super::DispatchResult) {
        for pending in self.pending.expire(now) {
            let node = pending.node;
            if !self.tree.contains(node) {
                continue;
            }
            if self.tree.is_root(node) {
                let root_path: Option<PathBuf> = self.tree.path_of(node).map(Path::to_path_buf);
                self.destroy_root(node, result);
                if let Some(root_path) = root_path {
                    tracing::info!(root = %root_path.display(), "project directory disappeared");
                    result.notices.push(Notice::RootLost {
                        root_path,
                        new_path: None,
                    });
                }
            } else {
                self.destroy_node(node, result);
            }
        }
        if let Some(next) = self.pending.next_deadline() {
            result.effects.push(Effect::ScheduleTick {
                after: next.saturating_duration_since(now),
            });
        }
    }
}
