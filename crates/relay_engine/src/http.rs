use std::fmt;
use std::time::Duration;

use relay_core::RoutingJob;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailureKind {
    InvalidEndpoint,
    Network,
    Timeout,
    HttpStatus(u16),
    InvalidBody,
    /// The companion answered but did not report `"success"`.
    Rejected { status: String },
}

impl fmt::Display for DeliveryFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryFailureKind::InvalidEndpoint => write!(f, "invalid endpoint"),
            DeliveryFailureKind::Network => write!(f, "network error"),
            DeliveryFailureKind::Timeout => write!(f, "timeout"),
            DeliveryFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            DeliveryFailureKind::InvalidBody => write!(f, "unparsable response body"),
            DeliveryFailureKind::Rejected { status } => {
                write!(f, "companion reported status {status:?}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DeliveryError {
    pub kind: DeliveryFailureKind,
    pub message: String,
}

impl DeliveryError {
    pub(crate) fn new(kind: DeliveryFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    status: Option<String>,
}

/// HTTP fallback to the companion's local endpoint.
#[derive(Debug, Clone)]
pub struct HttpDelivery {
    client: reqwest::Client,
}

impl HttpDelivery {
    pub fn new(settings: DeliverySettings) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| DeliveryError::new(DeliveryFailureKind::Network, err.to_string()))?;
        Ok(Self { client })
    }

    /// POSTs `job` as JSON and succeeds only when the reply's `status` is
    /// `"success"`.
    pub async fn deliver(&self, endpoint: &str, job: &RoutingJob) -> Result<(), DeliveryError> {
        let url = parse_endpoint(endpoint)?;
        let body = serde_json::to_vec(job)
            .map_err(|err| DeliveryError::new(DeliveryFailureKind::InvalidBody, err.to_string()))?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let reply: StatusReply = match serde_json::from_slice(&bytes) {
            Ok(reply) => reply,
            Err(err) if status.is_success() => {
                return Err(DeliveryError::new(
                    DeliveryFailureKind::InvalidBody,
                    err.to_string(),
                ));
            }
            Err(_) => {
                return Err(DeliveryError::new(
                    DeliveryFailureKind::HttpStatus(status.as_u16()),
                    status.to_string(),
                ));
            }
        };

        match reply.status.as_deref() {
            Some("success") => Ok(()),
            other => Err(DeliveryError::new(
                DeliveryFailureKind::Rejected {
                    status: other.unwrap_or_default().to_string(),
                },
                format!("http {}", status.as_u16()),
            )),
        }
    }

    /// Connectivity check: `OPTIONS <endpoint>` answered with a 2xx status.
    pub async fn probe(&self, endpoint: &str) -> bool {
        let Ok(url) = parse_endpoint(endpoint) else {
            return false;
        };
        match self.client.request(Method::OPTIONS, url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

fn parse_endpoint(endpoint: &str) -> Result<reqwest::Url, DeliveryError> {
    reqwest::Url::parse(endpoint.trim())
        .map_err(|err| DeliveryError::new(DeliveryFailureKind::InvalidEndpoint, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        return DeliveryError::new(DeliveryFailureKind::Timeout, err.to_string());
    }
    DeliveryError::new(DeliveryFailureKind::Network, err.to_string())
}
