//! Selection, active project and per-entry UI flags.

use rustc_hash::FxHashMap;

use crate::kernel::notice::Notice;
use crate::models::{NodeId, ProjectTree, StableId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OverlayFlag {
    OpenInEditor,
    NeedsSave,
    IsBuilding,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlayFlags {
    pub open_in_editor: bool,
    pub needs_save: bool,
    pub is_building: bool,
}

impl OverlayFlags {
    pub fn get(&self, flag: OverlayFlag) -> bool {
        match flag {
            OverlayFlag::OpenInEditor => self.open_in_editor,
            OverlayFlag::NeedsSave => self.needs_save,
            OverlayFlag::IsBuilding => self.is_building,
        }
    }

    fn slot(&mut self, flag: OverlayFlag) -> &mut bool {
        match flag {
            OverlayFlag::OpenInEditor => &mut self.open_in_editor,
            OverlayFlag::NeedsSave => &mut self.needs_save,
            OverlayFlag::IsBuilding => &mut self.is_building,
        }
    }

    fn is_clear(&self) -> bool {
        *self == Self::default()
    }
}

/// Flags are keyed by `StableId` so they follow a node through renames and
/// moves; selection and the active root are node handles re-validated on
/// every destruction.
#[derive(Debug, Default)]
pub struct Overlay {
    selected: Option<NodeId>,
    active: Option<NodeId>,
    flags: FxHashMap<StableId, OverlayFlags>,
}

impl Overlay {
    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    pub fn flags(&self, stable_id: StableId) -> OverlayFlags {
        self.flags.get(&stable_id).copied().unwrap_or_default()
    }

    pub fn flag(&self, stable_id: StableId, flag: OverlayFlag) -> bool {
        self.flags(stable_id).get(flag)
    }

    pub fn activate(&mut self, tree: &ProjectTree, root: NodeId) -> Option<Notice> {
        if !tree.is_root(root) || self.active == Some(root) {
            return None;
        }
        self.active = Some(root);
        Some(Notice::ActiveProjectChanged(Some(root)))
    }

    pub fn select(&mut self, node: Option<NodeId>) -> Option<Notice> {
        if self.selected == node {
            return None;
        }
        self.selected = node;
        Some(Notice::SelectionChanged(node))
    }

    pub fn set_flag(&mut self, stable_id: StableId, flag: OverlayFlag, value: bool) -> Option<Notice> {
        let flags = self.flags.entry(stable_id).or_default();
        let slot = flags.slot(flag);
        let changed = *slot != value;
        *slot = value;
        if flags.is_clear() {
            self.flags.remove(&stable_id);
        }
        changed.then_some(Notice::NodeOverlayChanged(stable_id, flag, value))
    }

    /// Call before `node`'s subtree leaves the tree. Moves the selection to
    /// the nearest ancestor that survives.
    pub fn on_destroying(&mut self, tree: &ProjectTree, node: NodeId) -> Option<Notice> {
        let selected = self.selected?;
        if selected != node && !tree.is_ancestor(node, selected) {
            return None;
        }
        self.select(tree.parent(node))
    }

    /// Call after a root closed. The first remaining root becomes active.
    pub fn on_root_closed(&mut self, tree: &ProjectTree, root: NodeId) -> Option<Notice> {
        if self.active != Some(root) {
            return None;
        }
        self.active = tree.roots().first().copied();
        Some(Notice::ActiveProjectChanged(self.active))
    }

    pub fn drop_flags(&mut self, removed: &[StableId]) {
        if self.flags.is_empty() {
            return;
        }
        for stable_id in removed {
            self.flags.remove(stable_id);
        }
    }

    /// At most one active root, and it is live.
    pub fn check_invariants(&self, tree: &ProjectTree) -> Result<(), String> {
        match self.active {
            Some(root) if !tree.is_root(root) => Err("active project is not an open root".into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/overlay.rs"]
mod tests;
