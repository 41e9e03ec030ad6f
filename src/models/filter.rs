//! Which directory entries never enter the tree.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Component, Path};

pub fn should_ignore(name: &str) -> bool {
    matches!(
        name,
        ".DS_Store"
            | ".Spotlight-V100"
            | ".Trashes"
            | ".fseventsd"
            | ".TemporaryItems"
            | "Thumbs.db"
            | "desktop.ini"
            | ".git"
            | "node_modules"
    )
}

/// Built-in junk names plus user exclude patterns (gitignore syntax), matched
/// against paths relative to their project root.
#[derive(Clone, Debug)]
pub struct PathFilter {
    builtin: bool,
    excludes: Gitignore,
}

impl Default for PathFilter {
    fn default() -> Self {
        Self {
            builtin: true,
            excludes: Gitignore::empty(),
        }
    }
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(builtin: bool, patterns: &[S]) -> Result<Self, ignore::Error> {
        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            builder.add_line(None, pattern.as_ref())?;
        }
        Ok(Self {
            builtin,
            excludes: builder.build()?,
        })
    }

    pub fn builtin_only(builtin: bool) -> Self {
        Self {
            builtin,
            excludes: Gitignore::empty(),
        }
    }

    pub fn is_ignored(&self, relative: &Path, is_dir: bool) -> bool {
        if self.builtin
            && relative.components().any(|component| match component {
                Component::Normal(name) => should_ignore(&name.to_string_lossy()),
                _ => false,
            })
        {
            return true;
        }
        if relative.has_root() || relative.as_os_str().is_empty() {
            return false;
        }
        self.excludes
            .matched_path_or_any_parents(relative, is_dir)
            .is_ignore()
    }

    /// `path` must lie under `root`; anything else is never ignored.
    pub fn is_ignored_under(&self, root: &Path, path: &Path, is_dir: bool) -> bool {
        match path.strip_prefix(root) {
            Ok(relative) => self.is_ignored(relative, is_dir),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/filter.rs"]
mod tests;
