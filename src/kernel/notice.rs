use std::path::PathBuf;

use crate::kernel::overlay::OverlayFlag;
use crate::models::{NodeId, StableId};

/// What collaborators hear about. Node handles may already be stale when a
/// notice is read; resolve them through the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    TreeChanged(NodeId),
    SelectionChanged(Option<NodeId>),
    ActiveProjectChanged(Option<NodeId>),
    NodeOverlayChanged(StableId, OverlayFlag, bool),
    StatChanged(PathBuf),
    ScanProgress {
        root: NodeId,
        staged: usize,
    },
    RootLost {
        root_path: PathBuf,
        new_path: Option<PathBuf>,
    },
    Warning(String),
}
