//! Command line arguments for the relay bridge.

use std::path::PathBuf;

use clap::Parser;

use relay_engine::COMPANION_HOST_NAME;

pub const DEFAULT_CONFIG_FILE: &str = "download_relay.ron";

/// Intercepts browser downloads and hands them to a companion download
/// manager.
///
/// Reads host events as JSON lines on stdin and writes commands and replies
/// as JSON lines on stdout.
#[derive(Parser, Debug)]
#[command(name = "download-relay")]
#[command(author, version, about)]
pub struct Args {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file (RON)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Companion executable to spawn directly, skipping manifest lookup
    #[arg(long)]
    pub companion: Option<PathBuf>,

    /// Native messaging host name to look up in the browser manifest directories
    #[arg(long, default_value = COMPANION_HOST_NAME)]
    pub host_name: String,

    /// Caller origin passed to the companion on launch
    #[arg(long)]
    pub origin: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Try to reopen a dropped channel before each routing attempt
    #[arg(long)]
    pub reconnect: bool,
}
