//! Headless core: the single-writer store, its actions, effects and notices.

pub mod action;
pub mod batch;
pub mod effect;
pub mod notice;
pub mod overlay;
pub mod services;
pub mod store;
pub mod sync;

pub use action::Action;
pub use batch::{BatchAccumulator, FlushReport};
pub use effect::Effect;
pub use notice::Notice;
pub use overlay::{Overlay, OverlayFlag, OverlayFlags};
pub use store::{DispatchResult, Store};
pub use sync::{PendingRemoval, PendingRemovals};
