//! Arena-backed mirror of every open project directory.

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use super::entry::{is_valid_name, Entry, EntryKind, StableId};
use super::natural::entry_order;

new_key_type! { pub struct NodeId; }

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    Populating,
    Loaded,
}

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("overlaps an open project: {0}")]
    AlreadyOpen(PathBuf),
    #[error("refusing to open a filesystem root: {0}")]
    DeviceRoot(PathBuf),
    #[error("name already exists in parent: {0}")]
    DuplicateName(PathBuf),
    #[error("cannot move node into its own subtree")]
    CycleDetected,
    #[error("parent is not a directory")]
    ParentNotDirectory,
    #[error("parent is not in the tree: {0}")]
    UnknownParent(PathBuf),
    #[error("project roots cannot be renamed or moved")]
    RootImmovable,
    #[error("invalid entry name: {0:?}")]
    InvalidName(OsString),
    #[error("invalid node id")]
    InvalidNodeId,
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TreeError {
    /// Duplicate, cycle or missing parent: recoverable by discarding the event.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TreeError::DuplicateName(_)
                | TreeError::CycleDetected
                | TreeError::UnknownParent(_)
                | TreeError::ParentNotDirectory
        )
    }
}

#[derive(Debug, Clone)]
struct Node {
    entry: Entry,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    load_state: LoadState,
}

impl Node {
    fn new(entry: Entry, parent: Option<NodeId>) -> Self {
        Self {
            entry,
            parent,
            children: Vec::new(),
            load_state: LoadState::Loaded,
        }
    }
}

pub struct ProjectTree {
    arena: SlotMap<NodeId, Node>,
    roots: Vec<NodeId>,
    id_by_path: FxHashMap<PathBuf, NodeId>,
    /// Hard links share a stable id, hence the list.
    ids_by_stable_id: FxHashMap<StableId, Vec<NodeId>>,
    case_sensitive: bool,
}

impl Default for ProjectTree {
    fn default() -> Self {
        Self::new(false)
    }
}

impl std::fmt::Debug for ProjectTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectTree")
            .field("roots", &self.roots.len())
            .field("nodes", &self.arena.len())
            .finish()
    }
}

impl ProjectTree {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            arena: SlotMap::with_key(),
            roots: Vec::new(),
            id_by_path: FxHashMap::default(),
            ids_by_stable_id: FxHashMap::default(),
            case_sensitive,
        }
    }

    pub fn open_root(&mut self, path: &Path) -> Result<NodeId, TreeError> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => metadata,
            Ok(_) => return Err(TreeError::NotADirectory(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TreeError::NotADirectory(path.to_path_buf()))
            }
            Err(source) => {
                return Err(TreeError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut entry = Entry::from_metadata(absolute, &metadata);
        entry.kind = EntryKind::ProjectRoot;
        let id = self.attach_root(entry)?;
        self.set_load_state(id, LoadState::Populating);
        Ok(id)
    }

    /// Registers an already-probed directory as a project root.
    pub fn attach_root(&mut self, mut entry: Entry) -> Result<NodeId, TreeError> {
        let path = entry.absolute_path.clone();
        if path.parent().is_none() {
            return Err(TreeError::DeviceRoot(path));
        }
        let overlaps = self.roots.iter().any(|&root| {
            self.path_of(root)
                .is_some_and(|open| open.starts_with(&path) || path.starts_with(open))
        });
        if overlaps {
            return Err(TreeError::AlreadyOpen(path));
        }

        entry.kind = EntryKind::ProjectRoot;
        let stable_id = entry.stable_id;
        let id = self.arena.insert(Node::new(entry, None));
        self.roots.push(id);
        self.index(path, stable_id, id);
        Ok(id)
    }

    /// Destroys a whole project. Stale or non-root handles are ignored.
    pub fn close_root(&mut self, root: NodeId) -> Vec<StableId> {
        let Some(pos) = self.roots.iter().position(|&r| r == root) else {
            return Vec::new();
        };
        self.roots.remove(pos);
        self.destroy_subtree(root)
    }

    pub fn lookup(&self, path: &Path) -> Option<NodeId> {
        self.id_by_path.get(path).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.arena
            .get(id)
            .is_some_and(|n| n.parent.is_none() && n.entry.kind == EntryKind::ProjectRoot)
    }

    pub fn entry(&self, id: NodeId) -> Option<&Entry> {
        self.arena.get(id).map(|n| &n.entry)
    }

    pub fn path_of(&self, id: NodeId) -> Option<&Path> {
        self.arena.get(id).map(|n| n.entry.absolute_path.as_path())
    }

    pub fn stable_id(&self, id: NodeId) -> Option<StableId> {
        self.arena.get(id).map(|n| n.entry.stable_id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.arena
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_dir(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some_and(|n| n.entry.is_dir())
    }

    pub fn load_state(&self, id: NodeId) -> Option<LoadState> {
        self.arena.get(id).map(|n| n.load_state)
    }

    pub fn set_load_state(&mut self, id: NodeId, state: LoadState) {
        if let Some(node) = self.arena.get_mut(id) {
            node.load_state = state;
        }
    }

    pub fn root_of(&self, mut id: NodeId) -> Option<NodeId> {
        loop {
            let node = self.arena.get(id)?;
            match node.parent {
                Some(parent) => id = parent,
                None => return Some(id),
            }
        }
    }

    /// The open root whose directory contains `path`.
    pub fn root_for_path(&self, path: &Path) -> Option<NodeId> {
        self.roots.iter().copied().find(|&root| {
            self.path_of(root)
                .is_some_and(|root_path| path.starts_with(root_path))
        })
    }

    pub fn find_by_stable_id(&self, stable_id: StableId) -> Option<NodeId> {
        self.nodes_with_stable_id(stable_id).first().copied()
    }

    /// Every live node for the object, in insertion order.
    pub fn nodes_with_stable_id(&self, stable_id: StableId) -> &[NodeId] {
        self.ids_by_stable_id
            .get(&stable_id)
            .map_or(&[], Vec::as_slice)
    }

    fn index(&mut self, path: PathBuf, stable_id: StableId, id: NodeId) {
        self.id_by_path.insert(path, id);
        self.ids_by_stable_id.entry(stable_id).or_default().push(id);
    }

    fn unindex(&mut self, id: NodeId, entry: &Entry) {
        if self.id_by_path.get(&entry.absolute_path) == Some(&id) {
            self.id_by_path.remove(&entry.absolute_path);
        }
        if let Some(ids) = self.ids_by_stable_id.get_mut(&entry.stable_id) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.ids_by_stable_id.remove(&entry.stable_id);
            }
        }
    }

    pub fn add_under(&mut self, parent: NodeId, entry: Entry) -> Result<NodeId, TreeError> {
        self.attach(parent, entry, true)
    }

    /// Appends without re-sorting; the caller must `sort_children(parent)`.
    pub(crate) fn add_under_unsorted(
        &mut self,
        parent: NodeId,
        entry: Entry,
    ) -> Result<NodeId, TreeError> {
        self.attach(parent, entry, false)
    }

    fn attach(&mut self, parent: NodeId, mut entry: Entry, sorted: bool) -> Result<NodeId, TreeError> {
        let parent_path = {
            let parent_ro = self.arena.get(parent).ok_or(TreeError::InvalidNodeId)?;
            if !parent_ro.entry.is_dir() {
                return Err(TreeError::ParentNotDirectory);
            }
            parent_ro.entry.absolute_path.clone()
        };
        if !is_valid_name(&entry.name) {
            return Err(TreeError::InvalidName(entry.name));
        }

        let path = parent_path.join(&entry.name);
        if self.id_by_path.contains_key(&path) {
            return Err(TreeError::DuplicateName(path));
        }

        if entry.kind == EntryKind::ProjectRoot {
            entry.kind = EntryKind::Folder;
        }
        entry.absolute_path = path.clone();
        let stable_id = entry.stable_id;
        let id = self.arena.insert(Node::new(entry, Some(parent)));
        self.index(path, stable_id, id);

        if sorted {
            let index = self.insertion_index(parent, id);
            if let Some(parent_node) = self.arena.get_mut(parent) {
                parent_node.children.insert(index, id);
            }
        } else if let Some(parent_node) = self.arena.get_mut(parent) {
            parent_node.children.push(id);
        }
        Ok(id)
    }

    fn insertion_index(&self, parent: NodeId, id: NodeId) -> usize {
        let Some(node) = self.arena.get(id) else {
            return 0;
        };
        let siblings = self.children(parent);
        siblings.partition_point(|&sibling| {
            self.arena.get(sibling).is_some_and(|s| {
                entry_order(
                    s.entry.kind,
                    &s.entry.name,
                    node.entry.kind,
                    &node.entry.name,
                    self.case_sensitive,
                )
                .is_lt()
            })
        })
    }

    pub fn sort_children(&mut self, parent: NodeId) {
        let Some(mut children) = self.arena.get_mut(parent).map(|n| std::mem::take(&mut n.children))
        else {
            return;
        };
        let arena = &self.arena;
        let case_sensitive = self.case_sensitive;
        children.sort_by(|&a, &b| match (arena.get(a), arena.get(b)) {
            (Some(a), Some(b)) => entry_order(
                a.entry.kind,
                &a.entry.name,
                b.entry.kind,
                &b.entry.name,
                case_sensitive,
            ),
            _ => std::cmp::Ordering::Equal,
        });
        if let Some(node) = self.arena.get_mut(parent) {
            node.children = children;
        }
    }

    /// Detaches and destroys the subtree at `id`, returning the stable ids
    /// that left the tree.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<StableId>, TreeError> {
        let parent = self.arena.get(id).ok_or(TreeError::InvalidNodeId)?.parent;
        let Some(parent) = parent else {
            return Ok(self.close_root(id));
        };
        if let Some(parent_node) = self.arena.get_mut(parent) {
            parent_node.children.retain(|&child| child != id);
        }
        Ok(self.destroy_subtree(id))
    }

    fn destroy_subtree(&mut self, id: NodeId) -> Vec<StableId> {
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            if let Some(node) = self.arena.remove(node_id) {
                self.unindex(node_id, &node.entry);
                removed.push(node.entry.stable_id);
                stack.extend(node.children);
            }
        }
        removed
    }

    pub fn is_ancestor(&self, ancestor: NodeId, mut descendant: NodeId) -> bool {
        while let Some(node) = self.arena.get(descendant) {
            if let Some(parent) = node.parent {
                if parent == ancestor {
                    return true;
                }
                descendant = parent;
            } else {
                break;
            }
        }
        false
    }

    /// Pre-order ids of `id` and everything below it.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            let Some(node) = self.arena.get(node_id) else {
                continue;
            };
            result.push(node_id);
            stack.extend(node.children.iter().rev().copied());
        }
        result
    }

    pub fn subtree_stable_ids(&self, id: NodeId) -> Vec<StableId> {
        self.subtree(id)
            .into_iter()
            .filter_map(|node_id| self.stable_id(node_id))
            .collect()
    }

    pub fn rename(&mut self, id: NodeId, new_name: OsString) -> Result<(), TreeError> {
        let parent = self
            .arena
            .get(id)
            .ok_or(TreeError::InvalidNodeId)?
            .parent
            .ok_or(TreeError::RootImmovable)?;
        self.reparent(id, parent, new_name)
    }

    /// Moves `id` under `new_parent` as `new_name`, rewriting the paths of the
    /// whole subtree. Either fully applies or leaves the tree unchanged.
    pub fn reparent(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
        new_name: OsString,
    ) -> Result<(), TreeError> {
        let (old_parent, old_path) = {
            let node = self.arena.get(id).ok_or(TreeError::InvalidNodeId)?;
            let parent = node.parent.ok_or(TreeError::RootImmovable)?;
            (parent, node.entry.absolute_path.clone())
        };
        let new_parent_path = {
            let parent = self.arena.get(new_parent).ok_or(TreeError::InvalidNodeId)?;
            if !parent.entry.is_dir() {
                return Err(TreeError::ParentNotDirectory);
            }
            parent.entry.absolute_path.clone()
        };
        if new_parent == id || self.is_ancestor(id, new_parent) {
            return Err(TreeError::CycleDetected);
        }
        if !is_valid_name(&new_name) {
            return Err(TreeError::InvalidName(new_name));
        }

        let new_path = new_parent_path.join(&new_name);
        if new_path == old_path {
            return Ok(());
        }
        if self.id_by_path.contains_key(&new_path) {
            return Err(TreeError::DuplicateName(new_path));
        }

        let subtree = self.subtree(id);
        for &node_id in &subtree {
            if let Some(node) = self.arena.get(node_id) {
                self.id_by_path.remove(&node.entry.absolute_path);
            }
        }

        if let Some(parent_node) = self.arena.get_mut(old_parent) {
            parent_node.children.retain(|&child| child != id);
        }
        if let Some(node) = self.arena.get_mut(id) {
            node.entry.name = new_name;
            node.entry.absolute_path = new_path;
            node.parent = Some(new_parent);
        }

        // Pre-order guarantees each parent is rewritten before its children.
        for &node_id in &subtree {
            let path = {
                let Some(node) = self.arena.get(node_id) else {
                    continue;
                };
                if node_id == id {
                    node.entry.absolute_path.clone()
                } else {
                    let parent_path = node
                        .parent
                        .and_then(|p| self.path_of(p))
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    parent_path.join(&node.entry.name)
                }
            };
            if let Some(node) = self.arena.get_mut(node_id) {
                node.entry.absolute_path = path.clone();
            }
            self.id_by_path.insert(path, node_id);
        }

        let index = self.insertion_index(new_parent, id);
        if let Some(parent_node) = self.arena.get_mut(new_parent) {
            parent_node.children.insert(index, id);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: NodeId,
    pub depth: u16,
    pub name: OsString,
    pub kind: EntryKind,
}

impl ProjectTree {
    /// Flattens every project in display order for list views.
    ///
    /// With a filter, only nodes whose name contains it (case-insensitively)
    /// and their ancestors are kept.
    pub fn rows(&self, filter: Option<&str>) -> Vec<TreeRow> {
        let needle = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);

        let keep = needle.as_ref().map(|needle| {
            let mut keep = rustc_hash::FxHashSet::default();
            for (id, node) in self.arena.iter() {
                if !node.entry.name_lossy().to_lowercase().contains(needle.as_str()) {
                    continue;
                }
                let mut current = Some(id);
                while let Some(node_id) = current {
                    if !keep.insert(node_id) {
                        break;
                    }
                    current = self.parent(node_id);
                }
            }
            keep
        });

        let mut result = Vec::new();
        let mut stack: Vec<(NodeId, u16)> = self.roots.iter().rev().map(|&r| (r, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            if keep.as_ref().is_some_and(|keep| !keep.contains(&id)) {
                continue;
            }
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            result.push(TreeRow {
                id,
                depth,
                name: node.entry.name.clone(),
                kind: node.entry.kind,
            });
            for &child in node.children.iter().rev() {
                stack.push((child, depth.saturating_add(1)));
            }
        }
        result
    }

    /// Verifies the structural invariants: paths, sibling names, index
    /// coverage and child order.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut reachable = 0usize;
        for &root in &self.roots {
            for id in self.subtree(root) {
                reachable += 1;
                let node = self.arena.get(id).ok_or("dangling node handle")?;
                if self.id_by_path.get(&node.entry.absolute_path) != Some(&id) {
                    return Err(format!(
                        "index does not resolve {}",
                        node.entry.absolute_path.display()
                    ));
                }
                if let Some(parent) = node.parent {
                    let parent = self.arena.get(parent).ok_or("dangling parent handle")?;
                    let expected = parent.entry.absolute_path.join(&node.entry.name);
                    if expected != node.entry.absolute_path {
                        return Err(format!(
                            "path mismatch: {} vs {}",
                            expected.display(),
                            node.entry.absolute_path.display()
                        ));
                    }
                    if !parent.children.contains(&id) {
                        return Err(format!("orphan {}", node.entry.absolute_path.display()));
                    }
                }
                for pair in node.children.windows(2) {
                    let (Some(a), Some(b)) = (self.arena.get(pair[0]), self.arena.get(pair[1])) else {
                        return Err("dangling child handle".into());
                    };
                    let (a, b) = (&a.entry, &b.entry);
                    if !entry_order(a.kind, &a.name, b.kind, &b.name, self.case_sensitive).is_lt() {
                        return Err(format!(
                            "children of {} out of order: {:?} !< {:?}",
                            node.entry.absolute_path.display(),
                            a.name,
                            b.name
                        ));
                    }
                }
            }
        }
        if reachable != self.arena.len() {
            return Err(format!(
                "{} nodes unreachable from roots",
                self.arena.len() - reachable
            ));
        }
        let by_stable_id: usize = self.ids_by_stable_id.values().map(Vec::len).sum();
        if by_stable_id != self.arena.len() {
            return Err(format!(
                "stable id index has {by_stable_id} entries for {} nodes",
                self.arena.len()
            ));
        }
        if self.id_by_path.len() != self.arena.len() {
            return Err(format!(
                "index has {} entries for {} nodes",
                self.id_by_path.len(),
                self.arena.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/project_tree.rs"]
mod tests;
