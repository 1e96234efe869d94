use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use relay_logging::{relay_debug, relay_info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

use crate::channel::{ChannelConnector, ChannelError, ChannelLink};

/// Well-known identifier of the companion download manager.
pub const COMPANION_HOST_NAME: &str = "com.downloadrelay.companion";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("no manifest named {0} found")]
    NotFound(String),
    #[error("io error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("manifest {0} declares unsupported type {1}")]
    UnsupportedType(String, String),
}

/// Registration file a browser uses to locate a native messaging host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeHostManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl NativeHostManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Self = serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if manifest.kind != "stdio" {
            return Err(ManifestError::UnsupportedType(manifest.name, manifest.kind));
        }
        Ok(manifest)
    }

    /// Looks for `<name>.json` in each directory, first match wins.
    pub fn find(name: &str, dirs: &[PathBuf]) -> Result<Self, ManifestError> {
        for dir in dirs {
            let candidate = dir.join(format!("{name}.json"));
            if candidate.is_file() {
                relay_debug!("Using native host manifest {:?}", candidate);
                return Self::load(&candidate);
            }
        }
        Err(ManifestError::NotFound(name.to_string()))
    }
}

/// Per-browser native messaging host directories for the current platform.
pub fn manifest_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if cfg!(target_os = "windows") {
        if let Some(local) = std::env::var_os("LOCALAPPDATA").map(PathBuf::from) {
            dirs.push(local.join("Google/Chrome/User Data/NativeMessagingHosts"));
            dirs.push(local.join("Microsoft/Edge/User Data/NativeMessagingHosts"));
        }
        if let Some(roaming) = std::env::var_os("APPDATA").map(PathBuf::from) {
            dirs.push(roaming.join("Mozilla/NativeMessagingHosts"));
        }
        return dirs;
    }

    let Some(home) = std::env::var_os("HOME").map(PathBuf::from) else {
        return dirs;
    };
    if cfg!(target_os = "macos") {
        let support = home.join("Library/Application Support");
        dirs.push(support.join("Google/Chrome/NativeMessagingHosts"));
        dirs.push(support.join("Microsoft Edge/NativeMessagingHosts"));
        dirs.push(support.join("Mozilla/NativeMessagingHosts"));
    } else {
        dirs.push(home.join(".config/google-chrome/NativeMessagingHosts"));
        dirs.push(home.join(".config/microsoft-edge/NativeMessagingHosts"));
        dirs.push(home.join(".mozilla/native-messaging-hosts"));
    }
    dirs
}

/// Opens the channel by spawning the companion executable and talking to it
/// over its stdin/stdout.
#[derive(Debug, Clone)]
pub struct NativeHostConnector {
    program: PathBuf,
    origin: Option<String>,
}

impl NativeHostConnector {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            origin: None,
        }
    }

    pub fn from_manifest(manifest: &NativeHostManifest) -> Self {
        Self::new(manifest.path.clone())
    }

    /// Caller origin passed as the first argument, as browsers do.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

#[async_trait::async_trait]
impl ChannelConnector for NativeHostConnector {
    async fn open(&self) -> Result<ChannelLink, ChannelError> {
        let mut command = Command::new(&self.program);
        if let Some(origin) = &self.origin {
            command.arg(origin);
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ChannelError::Connect(format!("{}: {err}", self.program.display())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ChannelError::Connect("companion stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ChannelError::Connect("companion stdout unavailable".into()))?;

        relay_info!(
            "Spawned companion {} (pid {:?})",
            self.program.display(),
            child.id()
        );
        Ok(ChannelLink::new(Box::new(stdout), Box::new(stdin)).with_keepalive(child))
    }
}
