use std::sync::{Arc, Mutex, MutexGuard};

use relay_core::{
    filename_from_url, update, ControllerState, DeliveryOutcome, Disposition, Effect,
    HostDownloadEvent, HostDownloadId, InterceptionSummary, JobOrigin, Msg, PageRequest,
    PageResponse, RoutingJob,
};
use relay_logging::{loggable_url, relay_debug, relay_info, relay_warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config_store::ConfigHandle;
use crate::router::Router;
use crate::scanner::PageScanner;

/// Commands the core sends back into the host browser.
pub trait HostControl: Send + Sync {
    /// Fire-and-forget; the host acknowledges on its own schedule.
    fn cancel(&self, id: HostDownloadId);
}

/// Stream of download-created notifications from the host.
#[async_trait::async_trait]
pub trait DownloadSource: Send {
    async fn next_download(&mut self) -> Option<HostDownloadEvent>;
}

#[async_trait::async_trait]
impl DownloadSource for mpsc::Receiver<HostDownloadEvent> {
    async fn next_download(&mut self) -> Option<HostDownloadEvent> {
        self.recv().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Routed {
        origin: JobOrigin,
        job: RoutingJob,
        outcome: DeliveryOutcome,
    },
}

struct Inner {
    state: Mutex<ControllerState>,
    config: ConfigHandle,
    router: Router,
    host: Arc<dyn HostControl>,
    scanner: PageScanner,
    events: mpsc::UnboundedSender<RelayEvent>,
}

/// Interception controller runtime: feeds host events and page requests
/// through [`relay_core::update`] and executes the resulting effects.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<Inner>,
}

impl Relay {
    pub fn new(
        config: ConfigHandle,
        router: Router,
        host: Arc<dyn HostControl>,
    ) -> (Self, mpsc::UnboundedReceiver<RelayEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let relay = Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ControllerState::new()),
                config,
                router,
                host,
                scanner: PageScanner::new(),
                events,
            }),
        };
        (relay, events_rx)
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.inner.config
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    pub fn summary(&self) -> InterceptionSummary {
        lock(&self.inner.state).summary()
    }

    pub fn disposition(&self, id: HostDownloadId) -> Option<Disposition> {
        lock(&self.inner.state).disposition(id)
    }

    /// Consumes host notifications until the source ends. Routing attempts
    /// run concurrently and may finish out of order.
    pub async fn run(&self, mut source: impl DownloadSource) {
        while let Some(event) = source.next_download().await {
            self.on_download_created(event);
        }
        relay_debug!("Download source closed");
    }

    pub fn on_download_created(
        &self,
        event: HostDownloadEvent,
    ) -> Vec<JoinHandle<DeliveryOutcome>> {
        let id = event.id;
        let url = event.url.clone();
        let handles = self.dispatch(Msg::DownloadCreated(event));
        if self.disposition(id) == Some(Disposition::Passthrough) {
            relay_debug!("Download {} left to host: {}", id, loggable_url(&url));
        }
        handles
    }

    /// Answers one page/popup request. Routing started by a request is not
    /// awaited; its result arrives as a [`RelayEvent`].
    pub fn handle_request(&self, request: PageRequest) -> PageResponse {
        match request {
            PageRequest::GetAllLinks { page } => {
                let config = self.inner.config.current();
                let jobs = self.inner.scanner.scan(&page, &config);
                let count = jobs.len();
                relay_info!("Page scan of {} found {} links", loggable_url(&page.url), count);
                self.dispatch(Msg::PageScanned(jobs));
                PageResponse::ok_with_count(count)
            }
            PageRequest::DownloadUrl {
                url,
                filename,
                referrer,
            } => {
                let filename = filename.or_else(|| Some(filename_from_url(&url)));
                self.dispatch(Msg::JobsRequested(vec![RoutingJob::new(url, filename, referrer)]));
                PageResponse::ok()
            }
            PageRequest::DownloadLinks { links, referrer } => {
                let count = links.len();
                let jobs = links
                    .into_iter()
                    .map(|link| RoutingJob::new(link.url, link.filename, referrer.clone()))
                    .collect();
                self.dispatch(Msg::JobsRequested(jobs));
                PageResponse::ok_with_count(count)
            }
            PageRequest::GetConfig => {
                PageResponse::Config(self.inner.config.current().to_persisted())
            }
            PageRequest::SetConfig { config } => {
                let next = self.inner.config.apply_update(&config);
                relay_info!(
                    "Configuration saved (enabled={}, {} suffixes)",
                    next.enabled,
                    next.accepted_suffixes().len()
                );
                PageResponse::ok()
            }
        }
    }

    /// Routes jobs the user asked for explicitly, e.g. an activated media
    /// control.
    pub fn request_jobs(&self, jobs: Vec<RoutingJob>) -> Vec<JoinHandle<DeliveryOutcome>> {
        self.dispatch(Msg::JobsRequested(jobs))
    }

    fn dispatch(&self, msg: Msg) -> Vec<JoinHandle<DeliveryOutcome>> {
        let effects = self.apply(msg);
        let mut handles = Vec::new();
        for effect in effects {
            match effect {
                Effect::CancelHostDownload { id } => {
                    relay_info!("Canceling host download {}", id);
                    self.inner.host.cancel(id);
                }
                Effect::Route { origin, job } => handles.push(self.spawn_route(origin, job)),
            }
        }
        handles
    }

    fn apply(&self, msg: Msg) -> Vec<Effect> {
        let config = self.inner.config.current();
        let mut state = lock(&self.inner.state);
        let (next, effects) = update(std::mem::take(&mut *state), &config, msg);
        *state = next;
        effects
    }

    fn spawn_route(&self, origin: JobOrigin, job: RoutingJob) -> JoinHandle<DeliveryOutcome> {
        let relay = self.clone();
        tokio::spawn(async move {
            let outcome = relay.inner.router.route(&job).await;
            if !outcome.succeeded {
                relay_warn!("Routing for {} failed: {}", origin, outcome.detail);
            }
            relay.apply(Msg::RouteFinished {
                origin,
                outcome: outcome.clone(),
            });
            let _ = relay.inner.events.send(RelayEvent::Routed {
                origin,
                job,
                outcome: outcome.clone(),
            });
            outcome
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
