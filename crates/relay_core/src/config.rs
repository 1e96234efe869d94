use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8765";
pub const DEFAULT_MIN_SIZE_BYTES: u64 = 1024 * 1024;

pub const DEFAULT_SUFFIXES: &[&str] = &[
    // Documents
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt",
    // Archives
    ".zip", ".rar", ".7z", ".tar", ".gz", ".bz2",
    // Media
    ".mp3", ".mp4", ".avi", ".mkv", ".mov", ".flv", ".wmv", ".jpg", ".jpeg", ".png", ".gif",
    ".bmp", ".tiff",
    // Executables
    ".exe", ".msi", ".dmg", ".iso", ".apk", ".deb", ".rpm",
];

/// Routing policy shared by every component.
///
/// Suffixes are kept lower-cased and dot-prefixed; use [`Configuration::new`]
/// or the merge helpers so that invariant holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub enabled: bool,
    /// Base URL of the companion's HTTP endpoint.
    pub endpoint: String,
    accepted_suffixes: Vec<String>,
    pub min_size_bytes: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(
            true,
            DEFAULT_ENDPOINT,
            DEFAULT_SUFFIXES.iter().copied(),
            DEFAULT_MIN_SIZE_BYTES,
        )
    }
}

impl Configuration {
    pub fn new<I, S>(
        enabled: bool,
        endpoint: impl Into<String>,
        suffixes: I,
        min_size_bytes: u64,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            enabled,
            endpoint: endpoint.into(),
            accepted_suffixes: normalize_suffixes(suffixes),
            min_size_bytes,
        }
    }

    /// Accepted suffixes in their persisted order.
    pub fn accepted_suffixes(&self) -> &[String] {
        &self.accepted_suffixes
    }

    pub fn accepts_suffix(&self, suffix: &str) -> bool {
        self.accepted_suffixes.iter().any(|s| s == suffix)
    }

    /// Overlays values read from storage at startup.
    ///
    /// A stored `minSize` of zero is treated as "not set" and keeps the
    /// built-in threshold, the same way an empty `serverUrl` does.
    pub fn with_persisted(&self, stored: &PersistedConfig) -> Self {
        let mut next = self.overlay(stored);
        if let Some(min) = stored.min_size.filter(|min| *min > 0) {
            next.min_size_bytes = min;
        }
        next
    }

    /// Applies a user save. Unlike [`Configuration::with_persisted`], an
    /// explicit `minSize` of zero switches the size threshold off.
    pub fn with_update(&self, update: &PersistedConfig) -> Self {
        let mut next = self.overlay(update);
        if let Some(min) = update.min_size {
            next.min_size_bytes = min;
        }
        next
    }

    pub fn to_persisted(&self) -> PersistedConfig {
        PersistedConfig {
            enabled: Some(self.enabled),
            server_url: Some(self.endpoint.clone()),
            file_types: Some(self.accepted_suffixes.clone()),
            min_size: Some(self.min_size_bytes),
        }
    }

    fn overlay(&self, stored: &PersistedConfig) -> Self {
        let mut next = self.clone();
        if let Some(enabled) = stored.enabled {
            next.enabled = enabled;
        }
        if let Some(url) = stored.server_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                next.endpoint = url.to_string();
            }
        }
        if let Some(types) = &stored.file_types {
            next.accepted_suffixes = normalize_suffixes(types);
        }
        next
    }
}

/// Key/value shape used by storage and by the `getConfig`/`setConfig`
/// page messages. Every field is optional on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_types: Option<Vec<String>>,
    /// Minimum size in bytes.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_byte_count"
    )]
    pub min_size: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl NumberLike {
    fn into_bytes(self) -> u64 {
        match self {
            NumberLike::Unsigned(v) => v,
            NumberLike::Signed(v) => u64::try_from(v).unwrap_or(0),
            NumberLike::Float(v) if v.is_finite() && v > 0.0 => v.trunc() as u64,
            NumberLike::Float(_) => 0,
        }
    }
}

// Page scripts send numbers as floats; negatives clamp to zero.
pub(crate) fn deserialize_byte_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberLike>::deserialize(deserializer).map(|n| n.map(NumberLike::into_bytes))
}

/// Lower-cases, dot-prefixes and de-duplicates suffixes, keeping first-seen order.
pub fn normalize_suffixes<I, S>(suffixes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in suffixes {
        let trimmed = raw.as_ref().trim().trim_start_matches('.');
        if trimmed.is_empty() {
            continue;
        }
        let suffix = format!(".{}", trimmed.to_lowercase());
        if !out.contains(&suffix) {
            out.push(suffix);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_are_normalized() {
        let got = normalize_suffixes(["PDF", ".Zip", " .pdf ", "", "."]);
        assert_eq!(got, vec![".pdf".to_string(), ".zip".to_string()]);
    }

    #[test]
    fn defaults_use_bytes() {
        let config = Configuration::default();
        assert!(config.enabled);
        assert_eq!(config.min_size_bytes, 1_048_576);
        assert!(config.accepts_suffix(".pdf"));
        assert!(!config.accepts_suffix(".html"));
    }

    #[test]
    fn stored_zero_min_size_keeps_default_but_update_honours_it() {
        let base = Configuration::default();
        let stored = PersistedConfig {
            min_size: Some(0),
            ..PersistedConfig::default()
        };
        assert_eq!(base.with_persisted(&stored).min_size_bytes, DEFAULT_MIN_SIZE_BYTES);
        assert_eq!(base.with_update(&stored).min_size_bytes, 0);
    }

    #[test]
    fn empty_server_url_is_ignored() {
        let base = Configuration::default();
        let stored = PersistedConfig {
            server_url: Some("  ".into()),
            ..PersistedConfig::default()
        };
        assert_eq!(base.with_persisted(&stored).endpoint, DEFAULT_ENDPOINT);
    }
}
