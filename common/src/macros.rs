//! Status macros.
//!
//! Thin wrappers around `tracing` so every crate reports progress the same
//! way. The terminal formatter in the binary keys off the event target to pick
//! the status glyph, so `success!` gets its own target.

/// Target for raw terminal output (banners, headers, trees).
pub const PRINT_TARGET: &str = "mtscan::print";

/// Target for events rendered as a success line.
pub const SUCCESS_TARGET: &str = "mtscan::success";

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::tracing::info!(target: "mtscan::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::tracing::error!($($arg)*)
    };
}
