use serde::{Deserialize, Serialize};

use crate::PersistedConfig;

/// A rendered page handed over by the page-rendering collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDocument {
    /// Address of the page; base for relative links and referrer of jobs.
    pub url: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRequest {
    pub url: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Page/popup to controller requests, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageRequest {
    GetAllLinks {
        page: PageDocument,
    },
    DownloadUrl {
        url: String,
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        referrer: Option<String>,
    },
    DownloadLinks {
        links: Vec<LinkRequest>,
        #[serde(default)]
        referrer: Option<String>,
    },
    GetConfig,
    SetConfig {
        config: PersistedConfig,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageResponse {
    Ack {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        count: Option<usize>,
    },
    Config(PersistedConfig),
}

impl PageResponse {
    pub fn ok() -> Self {
        PageResponse::Ack {
            success: true,
            count: None,
        }
    }

    pub fn ok_with_count(count: usize) -> Self {
        PageResponse::Ack {
            success: true,
            count: Some(count),
        }
    }
}
