use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Channel,
    Http,
    None,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Transport::Channel => "channel",
            Transport::Http => "http",
            Transport::None => "none",
        };
        f.write_str(name)
    }
}

/// Result of routing one job. Failure is terminal for that job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub succeeded: bool,
    pub transport_used: Transport,
    pub detail: String,
}

impl DeliveryOutcome {
    pub fn via_channel() -> Self {
        Self {
            succeeded: true,
            transport_used: Transport::Channel,
            detail: "delivered over channel".to_string(),
        }
    }

    pub fn via_http(detail: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            transport_used: Transport::Http,
            detail: detail.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            transport_used: Transport::None,
            detail: detail.into(),
        }
    }
}
