use std::path::PathBuf;
use std::time::Duration;

use crate::kernel::services::ports::ScanId;
use crate::models::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// List `dir` recursively and report back with `ScanChunk`/`ScanFinished`.
    StartScan {
        root: NodeId,
        scan: ScanId,
        root_path: PathBuf,
        dir: PathBuf,
    },
    CancelScan(ScanId),
    Watch(PathBuf),
    Unwatch(PathBuf),
    ScheduleTick {
        after: Duration,
    },
    RenamePath {
        from: PathBuf,
        to: PathBuf,
    },
}
