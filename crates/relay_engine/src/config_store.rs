use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use relay_core::{Configuration, PersistedConfig};
use relay_logging::{relay_error, relay_info, relay_warn};
use thiserror::Error;
use tokio::sync::watch;

use crate::persist::write_atomically;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse stored configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] ron::Error),
}

/// Key/value persistence for [`PersistedConfig`]. Writes are wholesale.
pub trait ConfigStorage: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<PersistedConfig>, StoreError>;
    fn save(&self, config: &PersistedConfig) -> Result<(), StoreError>;
}

/// Stores the configuration as a RON file.
#[derive(Debug, Clone)]
pub struct RonConfigStorage {
    path: PathBuf,
}

impl RonConfigStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStorage for RonConfigStorage {
    fn load(&self) -> Result<Option<PersistedConfig>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(ron::from_str(&content)?))
    }

    fn save(&self, config: &PersistedConfig) -> Result<(), StoreError> {
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(config, pretty)?;
        write_atomically(&self.path, &content)?;
        Ok(())
    }
}

/// Built-in defaults overlaid with whatever storage holds. Storage failures
/// are logged and fall back to defaults.
pub fn load_or_default(storage: &dyn ConfigStorage) -> Configuration {
    let defaults = Configuration::default();
    match storage.load() {
        Ok(Some(stored)) => {
            relay_info!("Loaded stored configuration");
            defaults.with_persisted(&stored)
        }
        Ok(None) => defaults,
        Err(err) => {
            relay_warn!("Configuration unavailable, using defaults: {}", err);
            defaults
        }
    }
}

/// Process-wide configuration. Readers take cheap snapshots; a save replaces
/// the whole value and then notifies subscribers.
#[derive(Clone)]
pub struct ConfigHandle {
    tx: Arc<watch::Sender<Arc<Configuration>>>,
    storage: Option<Arc<dyn ConfigStorage>>,
}

impl ConfigHandle {
    /// In-memory handle with nothing persisted.
    pub fn new(config: Configuration) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(config));
        Self {
            tx: Arc::new(tx),
            storage: None,
        }
    }

    /// Loads from `storage` (or defaults) and persists later replacements there.
    pub fn load(storage: Arc<dyn ConfigStorage>) -> Self {
        let config = load_or_default(storage.as_ref());
        let (tx, _rx) = watch::channel(Arc::new(config));
        Self {
            tx: Arc::new(tx),
            storage: Some(storage),
        }
    }

    pub fn current(&self) -> Arc<Configuration> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Configuration>> {
        self.tx.subscribe()
    }

    /// Swaps in `config`, notifies, then writes it through to storage.
    /// A failed write is logged; the in-memory value stays replaced.
    ///
    /// The write is synchronous and finishes before this returns, so the
    /// stored file always reflects the last call. It blocks the calling
    /// thread for one small file write.
    pub fn replace(&self, config: Configuration) -> Arc<Configuration> {
        let config = Arc::new(config);
        self.tx.send_replace(config.clone());
        if let Some(storage) = &self.storage {
            if let Err(err) = storage.save(&config.to_persisted()) {
                relay_error!("Failed to persist configuration: {}", err);
            }
        }
        config
    }

    /// Merges a user save into the current value.
    pub fn apply_update(&self, update: &PersistedConfig) -> Arc<Configuration> {
        let next = self.current().with_update(update);
        self.replace(next)
    }

    pub fn reset(&self) -> Arc<Configuration> {
        self.replace(Configuration::default())
    }
}
