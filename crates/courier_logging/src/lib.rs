#![deny(missing_docs)]
//! Shared logging utilities for the courier workspace.
//!
//! This crate provides the `courier_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every message is
//! prefixed with the scan pass that produced it, so interleaved rescans can be
//! told apart in the log.

use std::cell::Cell;

thread_local! {
    /// Thread-local storage for the current scan pass number.
    static SCAN_PASS: Cell<u64> = const { Cell::new(0) };
}

/// Sets the scan pass number for the current thread.
pub fn set_scan_pass(pass: u64) {
    SCAN_PASS.with(|v| v.set(pass));
}

/// Advances the scan pass number for the current thread and returns the new value.
/// The page session calls this once at the start of every scan.
pub fn next_scan_pass() -> u64 {
    SCAN_PASS.with(|v| {
        let next = v.get().wrapping_add(1);
        v.set(next);
        next
    })
}

/// Retrieves the scan pass number for the current thread.
/// Returns 0 outside of any scan.
pub fn current_scan_pass() -> u64 {
    SCAN_PASS.with(|v| v.get())
}

/// Logs a trace-level message tagged with the current scan pass.
#[macro_export]
macro_rules! courier_trace {
    ($($arg:tt)*) => {{
        log::trace!("[pass {}] {}", $crate::current_scan_pass(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current scan pass.
#[macro_export]
macro_rules! courier_debug {
    ($($arg:tt)*) => {{
        log::debug!("[pass {}] {}", $crate::current_scan_pass(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current scan pass.
#[macro_export]
macro_rules! courier_info {
    ($($arg:tt)*) => {{
        log::info!("[pass {}] {}", $crate::current_scan_pass(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current scan pass.
#[macro_export]
macro_rules! courier_warn {
    ($($arg:tt)*) => {{
        log::warn!("[pass {}] {}", $crate::current_scan_pass(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current scan pass.
#[macro_export]
macro_rules! courier_error {
    ($($arg:tt)*) => {{
        log::error!("[pass {}] {}", $crate::current_scan_pass(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::{current_scan_pass, next_scan_pass, set_scan_pass};

    #[test]
    fn scan_pass_advances_per_thread() {
        set_scan_pass(0);
        assert_eq!(next_scan_pass(), 1);
        assert_eq!(next_scan_pass(), 2);
        assert_eq!(current_scan_pass(), 2);

        let other = std::thread::spawn(current_scan_pass).join().unwrap();
        assert_eq!(other, 0);
    }
}
