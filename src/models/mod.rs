//! Data models for the logging and indexing subsystem.
//!
//! - [`LogIdentifier`] - stable key naming one transcript across dirty
//!   tracking and indexing
//! - [`IndexDocument`] / [`DocumentMetadata`] - what gets written into the
//!   full-text index
//! - [`IndexingProgress`] / [`IndexState`] - observable state of the
//!   background indexing worker

pub mod document;
pub mod identifier;
pub mod progress;

pub use document::{DocumentMetadata, IndexDocument};
pub use identifier::LogIdentifier;
pub use progress::{IndexState, IndexingProgress};
