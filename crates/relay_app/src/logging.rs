//! Logger setup for the relay binary.
//!
//! Stdout carries the bridge protocol, so terminal output goes to stderr.

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

pub fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logs to `log_file` when given, otherwise to stderr. Falls back to stderr
/// if the file cannot be created.
pub fn initialize(verbose: u8, log_file: Option<&Path>) {
    let level = level_for(verbose);
    let config = build_config();

    let file_logger =
        log_file.and_then(|path| create_file_logger(path, level, config.clone()));
    let logger: Box<dyn SharedLogger> = match file_logger {
        Some(file_logger) => file_logger,
        None => TermLogger::new(level, config, TerminalMode::Stderr, ColorChoice::Auto),
    };

    let _ = CombinedLogger::init(vec![logger]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<dyn SharedLogger>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}
