//! Removals waiting out the grace window.
//!
//! A remove notification does not destroy its node right away: a create with
//! the same stable id inside the window means the object moved, and the node
//! (with its overlay state) is carried over instead.

use rustc_hash::FxHashMap;
use std::time::Instant;

use crate::models::{NodeId, ProjectTree, StableId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingRemoval {
    pub node: NodeId,
    pub stable_id: StableId,
    pub deadline: Instant,
}

#[derive(Debug, Default)]
pub struct PendingRemovals {
    by_node: FxHashMap<NodeId, PendingRemoval>,
    /// Hard links share a stable id. Oldest mark first.
    by_stable_id: FxHashMap<StableId, Vec<NodeId>>,
}

impl PendingRemovals {
    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }

    pub fn is_pending(&self, node: NodeId) -> bool {
        self.by_node.contains_key(&node)
    }

    /// A repeated removal keeps the earlier deadline.
    pub fn mark(&mut self, stable_id: StableId, node: NodeId, deadline: Instant) {
        if self.by_node.contains_key(&node) {
            return;
        }
        self.by_node.insert(
            node,
            PendingRemoval {
                node,
                stable_id,
                deadline,
            },
        );
        self.by_stable_id.entry(stable_id).or_default().push(node);
    }

    /// Claims the oldest pending removal of the object, for a create that
    /// turned out to be a move.
    pub fn take(&mut self, stable_id: StableId) -> Option<PendingRemoval> {
        let node = *self.by_stable_id.get(&stable_id)?.first()?;
        self.cancel(node)
    }

    pub fn cancel(&mut self, node: NodeId) -> Option<PendingRemoval> {
        let pending = self.by_node.remove(&node)?;
        self.unlink(pending.stable_id, node);
        Some(pending)
    }

    /// Drops marks for nodes that just left `tree` with one of `removed`.
    pub fn forget(&mut self, removed: &[StableId], tree: &ProjectTree) {
        if self.by_node.is_empty() {
            return;
        }
        for stable_id in removed {
            let gone: Vec<NodeId> = self
                .by_stable_id
                .get(stable_id)
                .into_iter()
                .flatten()
                .copied()
                .filter(|&node| !tree.contains(node))
                .collect();
            for node in gone {
                self.cancel(node);
            }
        }
    }

    /// Removes and returns every entry whose deadline is at or before `now`,
    /// earliest first.
    pub fn expire(&mut self, now: Instant) -> Vec<PendingRemoval> {
        let mut expired = Vec::new();
        self.by_node.retain(|_, pending| {
            if pending.deadline <= now {
                expired.push(*pending);
                false
            } else {
                true
            }
        });
        for pending in &expired {
            self.unlink(pending.stable_id, pending.node);
        }
        expired.sort_by_key(|p| p.deadline);
        expired
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.by_node.values().map(|p| p.deadline).min()
    }

    fn unlink(&mut self, stable_id: StableId, node: NodeId) {
        if let Some(nodes) = self.by_stable_id.get_mut(&stable_id) {
            nodes.retain(|&other| other != node);
            if nodes.is_empty() {
                self.by_stable_id.remove(&stable_id);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/sync.rs"]
mod tests;
