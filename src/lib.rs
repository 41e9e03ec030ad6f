//! projtree - live mirror of opened project directories
//!
//! Module layout:
//! - models: entries, natural ordering, the `ProjectTree` arena
//! - kernel: the single-writer `Store` with its actions, effects and notices
//! - kernel::services: ports (config, scan, notifications) and adapters
//!   (notify watcher, directory scanner, tokio runtime, settings files)
//! - app: the headless `Session` that wires it all together

pub mod app;
pub mod kernel;
pub mod models;
