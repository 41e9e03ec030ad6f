use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Instant;

use crate::kernel::overlay::OverlayFlag;
use crate::kernel::services::ports::{FsNotification, ScanId};
use crate::models::{Entry, NodeId};

#[derive(Debug, Clone)]
pub enum Action {
    OpenRoot {
        path: PathBuf,
        activate: bool,
    },
    CloseRoot(NodeId),
    Activate(NodeId),
    Rename {
        node: NodeId,
        new_name: OsString,
    },
    SelectByPath(PathBuf),
    SetOverlay {
        path: PathBuf,
        flag: OverlayFlag,
        value: bool,
    },
    Rescan(PathBuf),
    Fs {
        event: FsNotification,
        at: Instant,
    },
    Tick {
        now: Instant,
    },
    ScanChunk {
        root: NodeId,
        scan: ScanId,
        entries: Vec<Entry>,
    },
    ScanFinished {
        root: NodeId,
        scan: ScanId,
        error: Option<String>,
    },
    WatchFailed {
        root: PathBuf,
        error: String,
    },
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}
