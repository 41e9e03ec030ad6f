use crate::kernel::services::ports::DirScanner;
use crate::models::{Entry, PathFilter};
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Lists directories with `std::fs`, never following symlinks.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalDirScanner;

impl DirScanner for LocalDirScanner {
    fn list_children(&self, dir: &Path) -> io::Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for item in std::fs::read_dir(dir)? {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let path = item.path();
            match std::fs::symlink_metadata(&path) {
                Ok(metadata) => entries.push(Entry::from_metadata(path, &metadata)),
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "entry vanished during scan"),
            }
        }
        Ok(entries)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub entries: usize,
    pub cancelled: bool,
    /// Directories that could not be listed, with the reason.
    pub errors: Vec<String>,
}

/// Breadth-first walk below `dir`, handing entries to `emit` in chunks of at
/// most `chunk_size`. Parents always precede their children across chunks.
/// `cancel` is checked before each directory.
pub fn scan_tree<S, F>(
    scanner: &S,
    filter: &PathFilter,
    root_path: &Path,
    dir: &Path,
    chunk_size: usize,
    cancel: &AtomicBool,
    mut emit: F,
) -> ScanSummary
where
    S: DirScanner + ?Sized,
    F: FnMut(Vec<Entry>),
{
    let chunk_size = chunk_size.max(1);
    let mut summary = ScanSummary::default();
    let mut chunk = Vec::with_capacity(chunk_size);
    let mut queue = VecDeque::from([dir.to_path_buf()]);

    while let Some(current) = queue.pop_front() {
        if cancel.load(Ordering::Relaxed) {
            summary.cancelled = true;
            return summary;
        }
        let children = match scanner.list_children(&current) {
            Ok(children) => children,
            Err(e) => {
                summary.errors.push(format!("{}: {e}", current.display()));
                continue;
            }
        };
        for entry in children {
            if filter.is_ignored_under(root_path, &entry.absolute_path, entry.is_dir()) {
                continue;
            }
            if entry.is_dir() {
                queue.push_back(entry.absolute_path.clone());
            }
            chunk.push(entry);
            summary.entries += 1;
            if chunk.len() >= chunk_size {
                emit(std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size)));
            }
        }
    }

    if !chunk.is_empty() {
        emit(chunk);
    }
    summary
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/scanner.rs"]
mod tests;
