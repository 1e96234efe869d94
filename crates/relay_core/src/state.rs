use std::collections::BTreeMap;

use crate::{DeliveryOutcome, HostDownloadId};

/// Oldest entries are forgotten beyond this many tracked host downloads.
pub const MAX_TRACKED_DOWNLOADS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Left to the host.
    Passthrough,
    /// Canceled in the host and handed to the router. Terminal.
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    pub disposition: Disposition,
    pub outcome: Option<DeliveryOutcome>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterceptionSummary {
    pub passthrough: usize,
    pub canceled: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Per-download lifecycle memory of the interception controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
    downloads: BTreeMap<HostDownloadId, DownloadRecord>,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: HostDownloadId) -> Option<&DownloadRecord> {
        self.downloads.get(&id)
    }

    pub fn disposition(&self, id: HostDownloadId) -> Option<Disposition> {
        self.downloads.get(&id).map(|record| record.disposition)
    }

    pub fn summary(&self) -> InterceptionSummary {
        let mut summary = InterceptionSummary::default();
        for record in self.downloads.values() {
            match record.disposition {
                Disposition::Passthrough => summary.passthrough += 1,
                Disposition::Canceled => summary.canceled += 1,
            }
            match &record.outcome {
                Some(outcome) if outcome.succeeded => summary.delivered += 1,
                Some(_) => summary.failed += 1,
                None => {}
            }
        }
        summary
    }

    pub(crate) fn has_seen(&self, id: HostDownloadId) -> bool {
        self.downloads.contains_key(&id)
    }

    pub(crate) fn mark(&mut self, id: HostDownloadId, disposition: Disposition) {
        self.downloads.insert(
            id,
            DownloadRecord {
                disposition,
                outcome: None,
            },
        );
        while self.downloads.len() > MAX_TRACKED_DOWNLOADS {
            self.downloads.pop_first();
        }
    }

    /// Stores the routing outcome; the disposition itself never changes.
    pub(crate) fn attach_outcome(&mut self, id: HostDownloadId, outcome: DeliveryOutcome) {
        if let Some(record) = self.downloads.get_mut(&id) {
            record.outcome = Some(outcome);
        }
    }
}
