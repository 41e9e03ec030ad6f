//! Data model: entries, ordering and the project tree arena.

pub mod entry;
pub mod filter;
pub mod natural;
pub mod project_tree;

pub use entry::{is_valid_name, Entry, EntryKind, StableId};
pub use filter::{should_ignore, PathFilter};
pub use natural::{entry_order, natural_compare};
pub use project_tree::{LoadState, NodeId, ProjectTree, TreeError, TreeRow};
