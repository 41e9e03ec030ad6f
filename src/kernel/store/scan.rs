use crate::kernel::services::ports::ScanId;
use crate::kernel::{Action, Notice};
use crate::models::{Entry, LoadState, NodeId};

impl super::Store {
    pub(super) fn reduce_scan_chunk(
        &mut self,
        root: NodeId,
        scan: ScanId,
        entries: Vec<Entry>,
        result: &mut super::DispatchResult,
    ) {
        match self.batches.stage(root, scan, entries) {
            Some(staged) => result.notices.push(Notice::ScanProgress { root, staged }),
            None => tracing::debug!(scan = scan.0, "late chunk for a cancelled scan"),
        }
    }

    pub(super) fn reduce_scan_finished(
        &mut self,
        root: NodeId,
        scan: ScanId,
        error: Option<String>,
        result: &mut super::DispatchResult,
    ) {
        if !self.batches.owns(root, scan) {
            tracing::debug!(scan = scan.0, "finish for an unknown scan");
            return;
        }
        if let Some(error) = error {
            tracing::warn!(scan = scan.0, error = %error, "scan incomplete");
            result.warn(error);
        }
        if !self.batches.finish_scan(root, scan) {
            return;
        }
        self.flush_batch(root, result);
    }

    fn flush_batch(&mut self, root: NodeId, result: &mut super::DispatchResult) {
        let overlay = &mut self.overlay;
        let pending = &mut self.pending;
        let mut notices = Vec::new();
        let report = self.batches.flush(&mut self.tree, root, |tree, node| {
            notices.extend(overlay.on_destroying(tree, node));
            if let Ok(removed) = tree.remove(node) {
                overlay.drop_flags(&removed);
                pending.forget(&removed, tree);
            }
        });
        for notice in notices {
            result.notice(Some(notice));
        }
        let Some(report) = report else {
            return;
        };

        self.tree.set_load_state(root, LoadState::Loaded);
        tracing::debug!(
            inserted = report.inserted,
            removed = report.removed,
            deferred = report.deferred.len(),
            "batch flushed"
        );
        result.tree_changed(Some(root));
        self.replay_deferred(report.deferred, result);
    }

    /// Replays actions that queued up behind a flushed batch. Each goes
    /// through its gate again, so a batch opened by a replayed create holds
    /// back the actions after it.
    fn replay_deferred(&mut self, deferred: Vec<Action>, result: &mut super::DispatchResult) {
        for action in deferred {
            self.apply(action, result);
        }
    }
}
