//! Service ports: traits + data contracts.

pub mod config;
pub mod notification;
pub mod scan;

pub use config::TreeConfig;
pub use notification::{FsNotification, FsOpcode};
pub use scan::{DirScanner, ScanId, ScanKind};
