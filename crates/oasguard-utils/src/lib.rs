//! Foundation utilities for oasguard
//!
//! Shared infrastructure used by every other crate in the workspace:
//! the [`Reporter`] logging sink, tracing initialization, and path helpers.

pub mod logging;
pub mod paths;
pub mod reporter;

pub use logging::init_tracing;
pub use paths::{ensure_dir_all, file_stem_of, sanitize_item_name};
pub use reporter::{Reporter, Severity};
