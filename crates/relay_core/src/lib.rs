//! Relay core: routing policy, domain types and the pure interception state machine.
mod candidate;
mod classify;
mod config;
mod effect;
mod filename;
mod msg;
mod outcome;
mod request;
mod state;
mod update;

pub use candidate::{DownloadCandidate, HostDownloadEvent, HostDownloadId, RoutingJob};
pub use classify::{classify, extract_suffix, Decision, RejectReason};
pub use config::{
    normalize_suffixes, Configuration, PersistedConfig, DEFAULT_ENDPOINT, DEFAULT_MIN_SIZE_BYTES,
    DEFAULT_SUFFIXES,
};
pub use effect::{Effect, JobOrigin};
pub use filename::{filename_from_url, suffix_of_name, suffix_of_url, url_path, FALLBACK_FILENAME};
pub use msg::Msg;
pub use outcome::{DeliveryOutcome, Transport};
pub use request::{LinkRequest, PageDocument, PageRequest, PageResponse};
pub use state::{
    ControllerState, Disposition, DownloadRecord, InterceptionSummary, MAX_TRACKED_DOWNLOADS,
};
pub use update::update;
