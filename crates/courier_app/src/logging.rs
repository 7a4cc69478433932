//! Logger initialization for the `courier` binary.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogDestination {
    File,
    /// Standard error, so command output on stdout stays clean.
    Terminal,
    Both,
}

/// Unknown level names fall back to `info`.
pub fn parse_level(raw: &str) -> LevelFilter {
    raw.parse().unwrap_or(LevelFilter::Info)
}

/// `-v` flags raise the configured level one step each.
pub fn raised_level(base: LevelFilter, verbose: u8) -> LevelFilter {
    let steps = [
        LevelFilter::Error,
        LevelFilter::Warn,
        LevelFilter::Info,
        LevelFilter::Debug,
        LevelFilter::Trace,
    ];
    let start = steps.iter().position(|l| *l == base).unwrap_or(2);
    steps[(start + usize::from(verbose)).min(steps.len() - 1)]
}

impl LogDestination {
    fn to_terminal(self) -> bool {
        matches!(self, LogDestination::Terminal | LogDestination::Both)
    }

    fn to_file(self) -> bool {
        matches!(self, LogDestination::File | LogDestination::Both)
    }
}

/// Installs the global logger. A log file that cannot be opened is reported
/// on stderr and skipped.
pub fn initialize(destination: LogDestination, level: LevelFilter, log_file: &Path) {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if destination.to_terminal() {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if destination.to_file() {
        match open_log_file(log_file) {
            Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
            Err(err) => eprintln!("warning: log file {} unavailable: {err}", log_file.display()),
        }
    }
    if loggers.is_empty() {
        return;
    }
    let _ = CombinedLogger::init(loggers);
}

/// Appends, so consecutive `courier` runs share one log.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_and_saturates() {
        assert_eq!(raised_level(LevelFilter::Info, 0), LevelFilter::Info);
        assert_eq!(raised_level(LevelFilter::Info, 1), LevelFilter::Debug);
        assert_eq!(raised_level(LevelFilter::Warn, 9), LevelFilter::Trace);
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level("loud"), LevelFilter::Info);
    }

    #[test]
    fn destinations_select_sinks() {
        assert!(LogDestination::Both.to_file() && LogDestination::Both.to_terminal());
        assert!(!LogDestination::Terminal.to_file());
        assert!(!LogDestination::File.to_terminal());
    }
}
