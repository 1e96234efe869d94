use crate::{DeliveryOutcome, HostDownloadEvent, JobOrigin, RoutingJob};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The host started a download.
    DownloadCreated(HostDownloadEvent),
    /// A routing attempt finished.
    RouteFinished {
        origin: JobOrigin,
        outcome: DeliveryOutcome,
    },
    /// The user explicitly asked for these jobs (context menu, media control,
    /// link list). Suffix and size rules do not apply.
    JobsRequested(Vec<RoutingJob>),
    /// Jobs a page scan already classified as accepted.
    PageScanned(Vec<RoutingJob>),
}
