//! Command-line interface for index maintenance

pub mod commands;

pub use commands::run;
