//! Data models for ranking sessions

pub mod item;
pub mod session;
pub mod view;

pub use item::{Item, ItemId, OwnerId};
pub use session::{RankingSession, SessionOptions};
pub use view::{GroupProgress, PairView, Progress, SessionView, TierAssignment};
