use crate::{HostDownloadId, RoutingJob};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fire-and-forget cancel of the host's own download.
    CancelHostDownload { id: HostDownloadId },
    Route { origin: JobOrigin, job: RoutingJob },
}

/// What produced a routing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOrigin {
    Intercepted(HostDownloadId),
    UserAction,
    PageScan,
}

impl std::fmt::Display for JobOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOrigin::Intercepted(id) => write!(f, "download {id}"),
            JobOrigin::UserAction => write!(f, "user action"),
            JobOrigin::PageScan => write!(f, "page scan"),
        }
    }
}
