//! Background indexing worker.
//!
//! State machine: `Disabled → Idle → Indexing → {Idle | Paused} →
//! Indexing → …`. One dedicated worker thread drains the dirty set into
//! the index store; pause, resume, and disable are cooperative flags
//! checked only at item boundaries, so no in-flight document write is ever
//! interrupted.

pub mod worker;

pub use worker::IndexingScheduler;
