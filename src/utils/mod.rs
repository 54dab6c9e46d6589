//! Shared utilities

pub mod paths;

pub use paths::{
    decode_component, default_log_base_dir, encode_component, format_path_with_tilde,
    index_cache_dir,
};
