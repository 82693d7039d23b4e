//! Per-user session state: the store, the live session record, and the
//! periodic reaper that expires idle sessions.

pub mod reaper;
pub mod store;

pub use reaper::Reaper;
pub use store::{SessionStore, UserSession, VideoRef};
