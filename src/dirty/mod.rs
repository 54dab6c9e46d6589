//! Dirty-log tracking.
//!
//! A transcript is "dirty" when its indexed content (if any) is stale. The
//! index is consistent only when the dirty set is empty. The tracker is the
//! single owner of the dirty set; every mutation goes through its lock.

pub mod persistence;
pub mod tracker;

pub use tracker::{DirtySetTracker, DirtyState};
