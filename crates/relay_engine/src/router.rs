use relay_core::{DeliveryOutcome, RoutingJob};
use relay_logging::{loggable_url, relay_debug, relay_info, relay_warn};

use crate::channel::{ChannelManager, ChannelState};
use crate::config_store::ConfigHandle;
use crate::http::HttpDelivery;

#[derive(Debug, Clone, Copy, Default)]
pub struct RouterSettings {
    /// Try one `connect()` before routing when the channel is down.
    pub reconnect_before_send: bool,
}

/// Delivers jobs to the companion: channel first, HTTP once as fallback.
///
/// A job that went out over the channel is never also posted over HTTP, and
/// nothing is retried beyond that single fallback.
#[derive(Clone)]
pub struct Router {
    channel: ChannelManager,
    http: HttpDelivery,
    config: ConfigHandle,
    settings: RouterSettings,
}

impl Router {
    pub fn new(channel: ChannelManager, http: HttpDelivery, config: ConfigHandle) -> Self {
        Self {
            channel,
            http,
            config,
            settings: RouterSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RouterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn channel(&self) -> &ChannelManager {
        &self.channel
    }

    pub async fn route(&self, job: &RoutingJob) -> DeliveryOutcome {
        if self.settings.reconnect_before_send
            && self.channel.state() == ChannelState::Disconnected
        {
            self.channel.connect().await;
        }

        if self.channel.state() == ChannelState::Connected {
            match self.channel.send(job).await {
                Ok(()) => {
                    relay_info!("Routed {} over channel", loggable_url(&job.url));
                    return DeliveryOutcome::via_channel();
                }
                Err(err) => {
                    relay_debug!("Channel send failed, falling back to http: {}", err);
                }
            }
        } else {
            relay_debug!("Channel not connected, using http fallback");
        }

        let endpoint = self.config.current().endpoint.clone();
        match self.http.deliver(&endpoint, job).await {
            Ok(()) => {
                relay_info!("Routed {} over http", loggable_url(&job.url));
                DeliveryOutcome::via_http(format!("accepted by {endpoint}"))
            }
            Err(err) => {
                relay_warn!("Delivery failed for {}: {}", loggable_url(&job.url), err);
                DeliveryOutcome::failed(err.to_string())
            }
        }
    }

    pub async fn probe(&self) -> bool {
        let endpoint = self.config.current().endpoint.clone();
        self.http.probe(&endpoint).await
    }
}
