use serde::{Deserialize, Serialize};

use crate::config::deserialize_byte_count;
use crate::filename::filename_from_url;

/// Identifier the host assigns to one of its downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostDownloadId(pub u64);

impl std::fmt::Display for HostDownloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A download-created notification as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostDownloadEvent {
    pub id: HostDownloadId,
    pub url: String,
    #[serde(default)]
    pub filename: Option<String>,
    /// Zero while the host has not determined the size yet; hosts that
    /// report `-1` for unknown end up here too.
    #[serde(default, deserialize_with = "deserialize_file_size")]
    pub file_size: u64,
    #[serde(default)]
    pub referrer: Option<String>,
}

fn deserialize_file_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_byte_count(deserializer).map(Option::unwrap_or_default)
}

/// A prospective download, evaluated before any transport decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCandidate {
    pub url: String,
    pub suggested_filename: Option<String>,
    pub referrer: Option<String>,
    pub size_bytes: Option<u64>,
    pub source_host_id: Option<HostDownloadId>,
}

impl DownloadCandidate {
    pub fn from_host_event(event: &HostDownloadEvent) -> Self {
        Self {
            url: event.url.clone(),
            suggested_filename: non_empty(event.filename.as_deref()),
            referrer: non_empty(event.referrer.as_deref()),
            size_bytes: (event.file_size > 0).then_some(event.file_size),
            source_host_id: Some(event.id),
        }
    }

    /// URL-only variant used for scraped page elements: the size is unknown
    /// and the filename comes from the last path segment.
    pub fn from_link(url: &str, referrer: Option<&str>) -> Self {
        Self {
            url: url.to_string(),
            suggested_filename: Some(filename_from_url(url)),
            referrer: non_empty(referrer),
            size_bytes: None,
            source_host_id: None,
        }
    }

    pub fn to_job(&self) -> RoutingJob {
        RoutingJob {
            url: self.url.clone(),
            filename: self.suggested_filename.clone(),
            referrer: self.referrer.clone(),
        }
    }
}

/// The minimal payload handed to the companion process. Serializes to the
/// wire shape `{url, filename, referrer}` with nulls for absent values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingJob {
    pub url: String,
    pub filename: Option<String>,
    pub referrer: Option<String>,
}

impl RoutingJob {
    pub fn new(url: impl Into<String>, filename: Option<String>, referrer: Option<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.filter(|f| !f.trim().is_empty()),
            referrer: referrer.filter(|r| !r.trim().is_empty()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_size_zero_means_unknown() {
        let event = HostDownloadEvent {
            id: HostDownloadId(4),
            url: "http://x/a.pdf".into(),
            filename: Some(String::new()),
            file_size: 0,
            referrer: None,
        };
        let candidate = DownloadCandidate::from_host_event(&event);
        assert_eq!(candidate.size_bytes, None);
        assert_eq!(candidate.suggested_filename, None);
        assert_eq!(candidate.source_host_id, Some(HostDownloadId(4)));
    }

    #[test]
    fn link_candidate_derives_filename() {
        let candidate = DownloadCandidate::from_link("http://x/files/a.zip?x=1", Some("http://x/"));
        assert_eq!(candidate.suggested_filename.as_deref(), Some("a.zip"));
        assert_eq!(candidate.referrer.as_deref(), Some("http://x/"));
    }
}
