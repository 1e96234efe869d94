use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use relay_logging::{relay_debug, relay_info, relay_warn};
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::frame::{read_frame, write_frame, FrameError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is not connected")]
    NotConnected,
    #[error("failed to open channel: {0}")]
    Connect(String),
    #[error("failed to send over channel: {0}")]
    Write(#[from] FrameError),
    #[error("companion did not accept the message within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy)]
pub struct ChannelSettings {
    /// Upper bound for writing one frame.
    pub send_timeout: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(5),
        }
    }
}

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An open byte stream pair to the companion process.
pub struct ChannelLink {
    reader: BoxedReader,
    writer: BoxedWriter,
    keepalive: Option<Box<dyn Any + Send>>,
}

impl ChannelLink {
    pub fn new(reader: BoxedReader, writer: BoxedWriter) -> Self {
        Self {
            reader,
            writer,
            keepalive: None,
        }
    }

    /// Keeps `guard` (for example a child process handle) alive for as long
    /// as the link is open.
    pub fn with_keepalive(mut self, guard: impl Any + Send) -> Self {
        self.keepalive = Some(Box::new(guard));
        self
    }
}

#[async_trait::async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn open(&self) -> Result<ChannelLink, ChannelError>;
}

type StateListener = Arc<dyn Fn(ChannelState) + Send + Sync>;
type MessageListener = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

struct Outbound {
    generation: u64,
    writer: BoxedWriter,
    _keepalive: Option<Box<dyn Any + Send>>,
}

struct Inner {
    connector: Arc<dyn ChannelConnector>,
    settings: ChannelSettings,
    state: Mutex<ChannelState>,
    // Bumped on every successful open so a stale reader cannot tear down a newer link.
    generation: AtomicU64,
    outbound: tokio::sync::Mutex<Option<Outbound>>,
    state_listeners: Mutex<Vec<StateListener>>,
    message_listeners: Mutex<Vec<MessageListener>>,
}

/// Owns the single persistent connection to the companion process.
///
/// There is no automatic reconnect: once the link drops the state stays
/// `Disconnected` until someone calls [`ChannelManager::connect`] again.
#[derive(Clone)]
pub struct ChannelManager {
    inner: Arc<Inner>,
}

impl ChannelManager {
    pub fn new(connector: Arc<dyn ChannelConnector>) -> Self {
        Self::with_settings(connector, ChannelSettings::default())
    }

    pub fn with_settings(connector: Arc<dyn ChannelConnector>, settings: ChannelSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                settings,
                state: Mutex::new(ChannelState::Disconnected),
                generation: AtomicU64::new(0),
                outbound: tokio::sync::Mutex::new(None),
                state_listeners: Mutex::new(Vec::new()),
                message_listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> ChannelState {
        *lock(&self.inner.state)
    }

    pub fn on_state_change(&self, listener: impl Fn(ChannelState) + Send + Sync + 'static) {
        lock(&self.inner.state_listeners).push(Arc::new(listener));
    }

    pub fn on_message(&self, listener: impl Fn(&serde_json::Value) + Send + Sync + 'static) {
        lock(&self.inner.message_listeners).push(Arc::new(listener));
    }

    /// Opens the link unless one is open or being opened. Returns the state
    /// reached once the attempt settles.
    pub async fn connect(&self) -> ChannelState {
        {
            let mut state = lock(&self.inner.state);
            if *state != ChannelState::Disconnected {
                return *state;
            }
            *state = ChannelState::Connecting;
        }
        self.notify_state(ChannelState::Connecting);

        match self.inner.connector.open().await {
            Ok(link) => {
                let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
                *self.inner.outbound.lock().await = Some(Outbound {
                    generation,
                    writer: link.writer,
                    _keepalive: link.keepalive,
                });
                self.transition(ChannelState::Connecting, ChannelState::Connected);
                relay_info!("Companion channel connected");

                let manager = self.clone();
                let reader = link.reader;
                tokio::spawn(async move {
                    manager.pump_incoming(reader, generation).await;
                });
                self.state()
            }
            Err(err) => {
                relay_warn!("Companion channel unavailable: {}", err);
                self.transition(ChannelState::Connecting, ChannelState::Disconnected);
                ChannelState::Disconnected
            }
        }
    }

    /// Writes one message. Fails at once when not connected; a write error
    /// or a write that outlasts `send_timeout` drops the link.
    pub async fn send<T>(&self, payload: &T) -> Result<(), ChannelError>
    where
        T: Serialize + ?Sized,
    {
        if self.state() != ChannelState::Connected {
            return Err(ChannelError::NotConnected);
        }

        let mut outbound = self.inner.outbound.lock().await;
        let Some(link) = outbound.as_mut() else {
            return Err(ChannelError::NotConnected);
        };
        let send_timeout = self.inner.settings.send_timeout;
        let written =
            tokio::time::timeout(send_timeout, write_frame(&mut link.writer, payload)).await;
        let err = match written {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => ChannelError::Write(err),
            Err(_) => ChannelError::Timeout(send_timeout),
        };

        // A partially written frame leaves the stream unusable.
        outbound.take();
        drop(outbound);
        relay_warn!("Companion channel send failed: {}", err);
        self.transition(ChannelState::Connected, ChannelState::Disconnected);
        Err(err)
    }

    async fn pump_incoming(&self, mut reader: BoxedReader, generation: u64) {
        loop {
            let next = read_frame(&mut reader).await;
            match next {
                Ok(Some(message)) => {
                    relay_debug!("Companion message: {}", message);
                    let listeners = lock(&self.inner.message_listeners).clone();
                    for listener in listeners {
                        listener(&message);
                    }
                }
                Ok(None) => {
                    relay_info!("Companion closed the channel");
                    break;
                }
                Err(err) => {
                    relay_warn!("Companion channel read failed: {}", err);
                    break;
                }
            }
        }

        {
            let mut outbound = self.inner.outbound.lock().await;
            if outbound.as_ref().map(|link| link.generation) != Some(generation) {
                return;
            }
            outbound.take();
        }
        self.transition(ChannelState::Connected, ChannelState::Disconnected);
    }

    /// Moves `from -> to` if the state is still `from`, then notifies.
    fn transition(&self, from: ChannelState, to: ChannelState) {
        {
            let mut state = lock(&self.inner.state);
            if *state != from {
                return;
            }
            *state = to;
        }
        self.notify_state(to);
    }

    fn notify_state(&self, state: ChannelState) {
        let listeners = lock(&self.inner.state_listeners).clone();
        for listener in listeners {
            listener(state);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
