//! # mtscan common
//!
//! Vocabulary shared by the `mtscan` crates: the external tools and pipeline
//! stages, scan targets, the per-session directory layout, configuration,
//! typed errors and the status macros used for terminal output.

pub mod config;
pub mod error;
pub mod macros;
pub mod request;
pub mod session;
pub mod stage;
pub mod tool;

pub use tracing;
