use std::path::PathBuf;
use std::sync::Arc;

use relay_engine::{
    manifest_search_dirs, ChannelConnector, ChannelError, ChannelLink, NativeHostConnector,
    NativeHostManifest,
};

use crate::cli::Args;

/// Resolves the companion through its native messaging manifest on every
/// open, so a companion installed after startup is picked up on reconnect.
pub struct ManifestConnector {
    host_name: String,
    dirs: Vec<PathBuf>,
    origin: Option<String>,
}

impl ManifestConnector {
    pub fn new(host_name: impl Into<String>, dirs: Vec<PathBuf>, origin: Option<String>) -> Self {
        Self {
            host_name: host_name.into(),
            dirs,
            origin,
        }
    }
}

#[async_trait::async_trait]
impl ChannelConnector for ManifestConnector {
    async fn open(&self) -> Result<ChannelLink, ChannelError> {
        let manifest = NativeHostManifest::find(&self.host_name, &self.dirs)
            .map_err(|err| ChannelError::Connect(err.to_string()))?;
        let mut connector = NativeHostConnector::from_manifest(&manifest);
        if let Some(origin) = &self.origin {
            connector = connector.with_origin(origin.clone());
        }
        connector.open().await
    }
}

pub fn from_args(args: &Args) -> Arc<dyn ChannelConnector> {
    match &args.companion {
        Some(program) => {
            let mut connector = NativeHostConnector::new(program.clone());
            if let Some(origin) = &args.origin {
                connector = connector.with_origin(origin.clone());
            }
            Arc::new(connector)
        }
        None => Arc::new(ManifestConnector::new(
            args.host_name.clone(),
            manifest_search_dirs(),
            args.origin.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unregistered_host_fails_to_open() {
        let dir = tempfile::TempDir::new().unwrap();
        let connector =
            ManifestConnector::new("com.example.absent", vec![dir.path().to_path_buf()], None);
        match connector.open().await {
            Err(ChannelError::Connect(message)) => assert!(message.contains("com.example.absent")),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("absent host must not connect"),
        }
    }
}
