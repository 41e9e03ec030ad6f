//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod runtime;
pub mod scanner;
pub mod settings;
pub mod watcher;

pub use runtime::AsyncRuntime;
pub use scanner::{scan_tree, LocalDirScanner, ScanSummary};
pub use settings::{
    ensure_config_file, ensure_log_dir, get_config_path, get_log_dir, load_config,
    load_config_from, resolve_log_dir, ConfigError,
};
pub use watcher::{WatchPolicy, WatchService};
