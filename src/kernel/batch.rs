//! Per-root staging of scan results.
//!
//! While a root has an outstanding scan its batch is open: scanned entries
//! are staged instead of inserted, and filesystem events for that root queue
//! up behind the batch, as do commands that would move a populating folder.
//! The last `finish_scan` lets the store flush: staged entries go into the
//! tree in one pass, each touched parent is sorted once, and the queued
//! actions are handed back in arrival order.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::path::PathBuf;

use crate::kernel::action::Action;
use crate::kernel::services::ports::{ScanId, ScanKind};
use crate::models::{Entry, NodeId, ProjectTree};

#[derive(Debug)]
struct ScanTicket {
    root: NodeId,
    kind: ScanKind,
    dir: PathBuf,
}

#[derive(Debug, Default)]
struct RootBatch {
    outstanding: FxHashSet<ScanId>,
    staged: Vec<Entry>,
    /// Directories being re-listed, with every path reported for them.
    /// Overlapping rescans of one directory share a set.
    rescans: FxHashMap<PathBuf, FxHashSet<PathBuf>>,
    deferred: VecDeque<Action>,
}

#[derive(Debug, Default)]
pub struct FlushReport {
    pub inserted: usize,
    pub removed: usize,
    pub deferred: Vec<Action>,
}

#[derive(Debug, Default)]
pub struct BatchAccumulator {
    batches: FxHashMap<NodeId, RootBatch>,
    scans: FxHashMap<ScanId, ScanTicket>,
    next_scan: u64,
}

impl BatchAccumulator {
    pub fn begin(&mut self, root: NodeId, dir: PathBuf, kind: ScanKind) -> ScanId {
        self.next_scan += 1;
        let scan = ScanId(self.next_scan);
        let batch = self.batches.entry(root).or_default();
        batch.outstanding.insert(scan);
        if kind == ScanKind::Rescan {
            batch.rescans.entry(dir.clone()).or_default();
        }
        self.scans.insert(scan, ScanTicket { root, kind, dir });
        scan
    }

    pub fn is_open(&self, root: NodeId) -> bool {
        self.batches.contains_key(&root)
    }

    pub fn owns(&self, root: NodeId, scan: ScanId) -> bool {
        self.scans.get(&scan).is_some_and(|t| t.root == root)
    }

    /// Returns the batch's staged total, or `None` for a scan that is no
    /// longer registered (cancelled or already finished).
    pub fn stage(&mut self, root: NodeId, scan: ScanId, entries: Vec<Entry>) -> Option<usize> {
        let ticket = self.scans.get(&scan).filter(|t| t.root == root)?;
        let batch = self.batches.get_mut(&root)?;
        if ticket.kind == ScanKind::Rescan {
            if let Some(seen) = batch.rescans.get_mut(&ticket.dir) {
                seen.extend(entries.iter().map(|e| e.absolute_path.clone()));
            }
        }
        batch.staged.extend(entries);
        Some(batch.staged.len())
    }

    /// Marks `scan` done. True when it was the root's last outstanding scan.
    pub fn finish_scan(&mut self, root: NodeId, scan: ScanId) -> bool {
        if !self.owns(root, scan) {
            return false;
        }
        self.scans.remove(&scan);
        match self.batches.get_mut(&root) {
            Some(batch) => {
                batch.outstanding.remove(&scan);
                batch.outstanding.is_empty()
            }
            None => false,
        }
    }

    /// Queues `action` behind the root's open batch. False when no batch is
    /// open and the caller should apply it now.
    pub fn defer(&mut self, root: NodeId, action: Action) -> bool {
        match self.batches.get_mut(&root) {
            Some(batch) => {
                batch.deferred.push_back(action);
                true
            }
            None => false,
        }
    }

    /// Discards the root's batch and returns the scans to cancel.
    pub fn cancel_root(&mut self, root: NodeId) -> Vec<ScanId> {
        self.batches.remove(&root);
        let mut cancelled: Vec<ScanId> = self
            .scans
            .iter()
            .filter(|(_, t)| t.root == root)
            .map(|(&scan, _)| scan)
            .collect();
        cancelled.sort();
        for scan in &cancelled {
            self.scans.remove(scan);
        }
        cancelled
    }

    /// Applies a closed batch to `tree`. `destroy` is called for nodes that
    /// must go (replaced by a different object, or missing from a rescan) so
    /// the caller can keep its own bookkeeping in step.
    pub fn flush<F>(&mut self, tree: &mut ProjectTree, root: NodeId, mut destroy: F) -> Option<FlushReport>
    where
        F: FnMut(&mut ProjectTree, NodeId),
    {
        if self
            .batches
            .get(&root)
            .is_some_and(|batch| !batch.outstanding.is_empty())
        {
            return None;
        }
        let batch = self.batches.remove(&root)?;
        let mut report = FlushReport::default();
        let mut touched: Vec<NodeId> = Vec::new();
        let mut touched_set: FxHashSet<NodeId> = FxHashSet::default();

        for entry in batch.staged {
            let Some(parent) = entry.absolute_path.parent().and_then(|p| tree.lookup(p)) else {
                tracing::debug!(path = %entry.absolute_path.display(), "staged entry has no parent in tree");
                continue;
            };
            if let Some(existing) = tree.lookup(&entry.absolute_path) {
                let same = tree
                    .entry(existing)
                    .is_some_and(|e| e.stable_id == entry.stable_id && e.is_dir() == entry.is_dir());
                if same {
                    continue;
                }
                destroy(tree, existing);
                report.removed += 1;
            }
            match tree.add_under_unsorted(parent, entry) {
                Ok(_) => {
                    report.inserted += 1;
                    if touched_set.insert(parent) {
                        touched.push(parent);
                    }
                }
                Err(e) => tracing::debug!(error = %e, "staged entry rejected"),
            }
        }

        for parent in touched {
            tree.sort_children(parent);
        }

        for (dir, seen) in batch.rescans {
            let Some(dir_node) = tree.lookup(&dir) else {
                continue;
            };
            for node in tree.subtree(dir_node).into_iter().skip(1) {
                let Some(path) = tree.path_of(node) else {
                    continue;
                };
                if !seen.contains(path) {
                    destroy(tree, node);
                    report.removed += 1;
                }
            }
        }

        report.deferred = batch.deferred.into_iter().collect();
        Some(report)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/batch.rs"]
mod tests;
