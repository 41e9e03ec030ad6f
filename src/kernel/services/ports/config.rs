use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::PathFilter;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// How long a removed node waits for a matching create before it is
    /// destroyed.
    pub grace_window_ms: u64,
    pub scan_chunk_size: usize,
    pub watch_poll_interval_ms: u64,
    pub case_sensitive_sort: bool,
    /// Gitignore-style patterns relative to each project root.
    pub exclude: Vec<String>,
    pub ignore_builtin: bool,
    /// Where the daily log files go. Unset means the per-user cache dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// `tracing` filter directives, used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            grace_window_ms: 200,
            scan_chunk_size: 256,
            watch_poll_interval_ms: 250,
            case_sensitive_sort: false,
            exclude: Vec::new(),
            ignore_builtin: true,
            log_dir: None,
            log_filter: "projtree=info".to_string(),
        }
    }
}

impl TreeConfig {
    pub fn grace_window(&self) -> Duration {
        Duration::from_millis(self.grace_window_ms)
    }

    pub fn watch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch_poll_interval_ms)
    }

    pub fn chunk_size(&self) -> usize {
        self.scan_chunk_size.max(1)
    }

    pub fn path_filter(&self) -> Result<PathFilter, ignore::Error> {
        PathFilter::new(self.ignore_builtin, self.exclude.as_slice())
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/config.rs"]
mod tests;
