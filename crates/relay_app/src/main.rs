mod bridge;
mod cli;
mod connector;
mod logging;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use relay_engine::{
    ChannelManager, ChannelState, ConfigHandle, DeliverySettings, HttpDelivery, Relay,
    RonConfigStorage, Router, RouterSettings,
};
use relay_logging::{relay_info, relay_warn};
use tokio::io::BufReader;
use tokio::sync::mpsc;

use crate::bridge::{read_input, report_events, write_outputs, Bridge, Output};
use crate::cli::Args;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(25);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::initialize(args.verbose, args.log_file.as_deref());
    run(args).await
}

async fn run(args: Args) -> anyhow::Result<()> {
    let storage = Arc::new(RonConfigStorage::new(&args.config));
    relay_info!("Starting download relay, config at {:?}", storage.path());
    let config = ConfigHandle::load(storage);

    let settings = DeliverySettings::default();
    let http = HttpDelivery::new(settings).context("building http client")?;
    let channel = ChannelManager::new(connector::from_args(&args));
    let router = Router::new(channel.clone(), http, config.clone()).with_settings(RouterSettings {
        reconnect_before_send: args.reconnect,
    });

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let output = Output::new(out_tx);
    let writer = tokio::spawn(write_outputs(out_rx, tokio::io::stdout()));

    channel.on_state_change(output.state_reporter());
    channel.on_message(|message| {
        if message.get("status").and_then(|status| status.as_str()) == Some("error") {
            let detail = message.get("message").and_then(|m| m.as_str()).unwrap_or("no detail");
            relay_warn!("Companion reported an error: {}", detail);
        }
    });

    let (relay, events) = Relay::new(config, router, Arc::new(output.clone()));
    let reporter = tokio::spawn(report_events(events, output.clone()));

    if channel.connect().await != ChannelState::Connected && !relay.router().probe().await {
        relay_warn!(
            "Companion unreachable over both channel and http; downloads will fail until it starts"
        );
    }

    let mut bridge = Bridge::new(relay, output);
    read_input(BufReader::new(tokio::io::stdin()), &mut bridge)
        .await
        .context("reading host input")?;
    relay_info!("Host input closed, shutting down");

    if tokio::time::timeout(SHUTDOWN_GRACE, bridge.finish()).await.is_err() {
        relay_warn!("Gave up waiting for in-flight routing");
    }
    // The bridge owned the last relay handle; once the reporter drains,
    // the writer sees every sender gone and returns.
    if tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = reporter.await;
        let _ = writer.await;
    })
    .await
    .is_err()
    {
        relay_warn!("Output did not drain before shutdown");
    }
    Ok(())
}
