use std::path::{Path, PathBuf};

use crate::models::{EntryKind, StableId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FsOpcode {
    Created,
    Removed,
    Moved,
    StatChanged,
}

/// One filesystem change as reported by a watch on `watched_root`.
///
/// `stable_id` and `kind` describe the object now at `path` when the source
/// could observe it; the store stats the path itself when they are missing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsNotification {
    pub opcode: FsOpcode,
    pub path: PathBuf,
    pub old_path: Option<PathBuf>,
    pub stable_id: Option<StableId>,
    pub kind: Option<EntryKind>,
    pub watched_root: PathBuf,
}

impl FsNotification {
    fn new(opcode: FsOpcode, watched_root: &Path, path: PathBuf) -> Self {
        Self {
            opcode,
            path,
            old_path: None,
            stable_id: None,
            kind: None,
            watched_root: watched_root.to_path_buf(),
        }
    }

    pub fn created(watched_root: &Path, path: PathBuf) -> Self {
        Self::new(FsOpcode::Created, watched_root, path)
    }

    pub fn removed(watched_root: &Path, path: PathBuf) -> Self {
        Self::new(FsOpcode::Removed, watched_root, path)
    }

    pub fn moved(watched_root: &Path, old_path: PathBuf, path: PathBuf) -> Self {
        Self {
            old_path: Some(old_path),
            ..Self::new(FsOpcode::Moved, watched_root, path)
        }
    }

    pub fn stat_changed(watched_root: &Path, path: PathBuf) -> Self {
        Self::new(FsOpcode::StatChanged, watched_root, path)
    }

    pub fn with_identity(mut self, stable_id: StableId, kind: EntryKind) -> Self {
        self.stable_id = Some(stable_id);
        self.kind = Some(kind);
        self
    }
}
