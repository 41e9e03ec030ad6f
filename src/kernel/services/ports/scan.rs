use std::io;
use std::path::Path;

use crate::models::Entry;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanId(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScanKind {
    /// Fills a freshly opened root or a folder that appeared.
    Populate,
    /// Re-lists an existing folder; nodes the scan does not see are dropped.
    Rescan,
}

/// Lists the immediate children of a directory.
pub trait DirScanner: Send + Sync {
    fn list_children(&self, dir: &Path) -> io::Result<Vec<Entry>>;
}
