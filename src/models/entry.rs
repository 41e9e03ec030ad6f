//! Filesystem entry identity.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Folder,
    ProjectRoot,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Folder | EntryKind::ProjectRoot)
    }
}

/// Device + file serial of a filesystem object.
///
/// Two entries with the same `StableId` are the same object even when their
/// paths differ, which is what lets a remove/create pair be recognised as a
/// move.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableId {
    pub device: u64,
    pub serial: u64,
}

impl StableId {
    pub const fn new(device: u64, serial: u64) -> Self {
        Self { device, serial }
    }

    #[cfg(unix)]
    pub fn from_metadata(_path: &Path, metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self::new(metadata.dev(), metadata.ino())
    }

    // No portable inode on these targets; identity degrades to the path.
    #[cfg(not(unix))]
    pub fn from_metadata(path: &Path, _metadata: &Metadata) -> Self {
        use std::hash::{Hash, Hasher};
        let mut hasher = rustc_hash::FxHasher::default();
        path.hash(&mut hasher);
        Self::new(0, hasher.finish())
    }

    pub fn of_path(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(Self::from_metadata(path, &metadata))
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device, self.serial)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    pub name: OsString,
    pub absolute_path: PathBuf,
    pub stable_id: StableId,
}

impl Entry {
    pub fn new(kind: EntryKind, absolute_path: PathBuf, stable_id: StableId) -> Self {
        let name = entry_name(&absolute_path);
        Self {
            kind,
            name,
            absolute_path,
            stable_id,
        }
    }

    pub fn from_metadata(absolute_path: PathBuf, metadata: &Metadata) -> Self {
        let kind = if metadata.is_dir() {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        let stable_id = StableId::from_metadata(&absolute_path, metadata);
        Self::new(kind, absolute_path, stable_id)
    }

    /// Stats `path` without following symlinks.
    pub fn probe(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(Self::from_metadata(path.to_path_buf(), &metadata))
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        self.name.to_string_lossy()
    }
}

pub(crate) fn entry_name(path: &Path) -> OsString {
    path.file_name()
        .or_else(|| path.iter().next_back())
        .unwrap_or(path.as_os_str())
        .to_os_string()
}

/// A name is usable as a single path component.
pub fn is_valid_name(name: &OsStr) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(first)), None) if first == name
    )
}

#[cfg(test)]
#[path = "../../tests/unit/models/entry.rs"]
mod tests;
