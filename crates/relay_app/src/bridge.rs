//! JSON-lines protocol between the host browser shim and the relay.

use std::collections::HashMap;

use relay_core::{
    DeliveryOutcome, HostDownloadEvent, HostDownloadId, JobOrigin, PageDocument, PageRequest,
    PageResponse,
};
use relay_engine::{ChannelState, HostControl, MediaAugmenter, MediaControl, Relay, RelayEvent};
use relay_logging::{loggable_url, relay_debug, relay_info, relay_warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BridgeInput {
    DownloadCreated(HostDownloadEvent),
    Request { request_id: Value, body: PageRequest },
    ContentChanged { page: PageDocument },
    MediaActivated { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BridgeOutput {
    Cancel { id: HostDownloadId },
    Reply { request_id: Value, body: PageResponse },
    MediaControls { urls: Vec<String> },
    Status { message: String },
}

/// Sending half of the stdout writer. Doubles as the host control, since
/// cancel commands travel the same way as every other output.
#[derive(Clone)]
pub struct Output {
    tx: mpsc::UnboundedSender<BridgeOutput>,
}

impl Output {
    pub fn new(tx: mpsc::UnboundedSender<BridgeOutput>) -> Self {
        Self { tx }
    }

    pub fn send(&self, output: BridgeOutput) {
        if self.tx.send(output).is_err() {
            relay_debug!("Output closed, dropping message");
        }
    }

    pub fn status(&self, message: impl Into<String>) {
        self.send(BridgeOutput::Status {
            message: message.into(),
        });
    }

    /// Status reporter that does not keep the writer alive.
    pub fn state_reporter(&self) -> impl Fn(ChannelState) + Send + Sync + 'static {
        let weak = self.tx.downgrade();
        move |state| {
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(BridgeOutput::Status {
                    message: format!("companion channel {}", state_label(state)),
                });
            }
        }
    }
}

impl HostControl for Output {
    fn cancel(&self, id: HostDownloadId) {
        self.send(BridgeOutput::Cancel { id });
    }
}

fn state_label(state: ChannelState) -> &'static str {
    match state {
        ChannelState::Disconnected => "disconnected",
        ChannelState::Connecting => "connecting",
        ChannelState::Connected => "connected",
    }
}

pub struct Bridge {
    relay: Relay,
    output: Output,
    media: MediaAugmenter,
    controls: HashMap<String, MediaControl>,
    page_url: Option<String>,
    pending: Vec<JoinHandle<DeliveryOutcome>>,
}

impl Bridge {
    pub fn new(relay: Relay, output: Output) -> Self {
        Self {
            relay,
            output,
            media: MediaAugmenter::new(),
            controls: HashMap::new(),
            page_url: None,
            pending: Vec::new(),
        }
    }

    /// Raw input line. Bytes that are not UTF-8 are skipped like malformed
    /// JSON; the stream keeps going.
    pub fn handle_bytes(&mut self, bytes: &[u8]) {
        match std::str::from_utf8(bytes) {
            Ok(line) => self.handle_line(line),
            Err(err) => {
                relay_warn!("Ignoring input line that is not UTF-8: {}", err);
                self.output.status(format!("ignored malformed input: {err}"));
            }
        }
    }

    pub fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<BridgeInput>(line) {
            Ok(input) => self.handle(input),
            Err(err) => {
                relay_warn!("Ignoring malformed input line: {}", err);
                self.output.status(format!("ignored malformed input: {err}"));
            }
        }
    }

    pub fn handle(&mut self, input: BridgeInput) {
        match input {
            BridgeInput::DownloadCreated(event) => {
                let handles = self.relay.on_download_created(event);
                self.track(handles);
            }
            BridgeInput::Request { request_id, body } => {
                let body = self.relay.handle_request(body);
                self.output.send(BridgeOutput::Reply { request_id, body });
            }
            BridgeInput::ContentChanged { page } => self.refresh_media(&page),
            BridgeInput::MediaActivated { url } => self.activate_media(&url),
        }
    }

    /// Waits for routing attempts that are still running.
    pub async fn finish(mut self) {
        for handle in self.pending.drain(..) {
            if let Err(err) = handle.await {
                relay_warn!("Routing task ended abnormally: {}", err);
            }
        }
    }

    fn track(&mut self, handles: Vec<JoinHandle<DeliveryOutcome>>) {
        self.pending.retain(|handle| !handle.is_finished());
        self.pending.extend(handles);
    }

    fn refresh_media(&mut self, page: &PageDocument) {
        if self.page_url.as_deref() != Some(page.url.as_str()) {
            self.media.clear();
            self.controls.clear();
            self.page_url = Some(page.url.clone());
        }
        let fresh = self.media.refresh(page);
        if fresh.is_empty() {
            return;
        }
        let urls = fresh
            .iter()
            .map(|control| control.source_url().to_string())
            .collect();
        for control in fresh {
            self.controls
                .insert(control.source_url().to_string(), control);
        }
        self.output.send(BridgeOutput::MediaControls { urls });
    }

    fn activate_media(&mut self, url: &str) {
        let Some(control) = self.controls.remove(url) else {
            relay_debug!("No media control for {}", loggable_url(url));
            self.output.status(format!("no media control for {url}"));
            return;
        };
        let handles = self.relay.request_jobs(vec![control.activate()]);
        self.track(handles);
    }
}

/// Feeds newline-separated input to the bridge until end of stream.
pub async fn read_input<R>(mut reader: R, bridge: &mut Bridge) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        bridge.handle_bytes(&line);
    }
}

/// Serialises outputs as JSON lines until every sender is gone.
pub async fn write_outputs<W>(mut rx: mpsc::UnboundedReceiver<BridgeOutput>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(output) = rx.recv().await {
        let mut line = match serde_json::to_string(&output) {
            Ok(line) => line,
            Err(err) => {
                relay_warn!("Could not serialise output: {}", err);
                continue;
            }
        };
        line.push('\n');
        if let Err(err) = writer.write_all(line.as_bytes()).await {
            relay_warn!("Host output closed: {}", err);
            break;
        }
        if let Err(err) = writer.flush().await {
            relay_warn!("Host output closed: {}", err);
            break;
        }
    }
}

/// Logs routing results and tells the host about failed hand-offs.
pub async fn report_events(mut events: mpsc::UnboundedReceiver<RelayEvent>, output: Output) {
    while let Some(event) = events.recv().await {
        let RelayEvent::Routed {
            origin,
            job,
            outcome,
        } = event;
        if outcome.succeeded {
            relay_info!(
                "{} handed off via {}: {}",
                origin,
                outcome.transport_used,
                loggable_url(&job.url)
            );
            continue;
        }
        let message = match origin {
            JobOrigin::Intercepted(id) => format!(
                "download {id} was canceled but could not be handed off: {}",
                outcome.detail
            ),
            JobOrigin::UserAction | JobOrigin::PageScan => {
                format!("could not hand off {}: {}", job.url, outcome.detail)
            }
        };
        output.status(message);
    }
}
