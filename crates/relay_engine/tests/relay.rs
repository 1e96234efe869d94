use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use relay_core::{
    Configuration, Disposition, HostDownloadEvent, HostDownloadId, JobOrigin, LinkRequest,
    PageDocument, PageRequest, PageResponse, PersistedConfig, Transport,
};
use relay_engine::{
    ChannelConnector, ChannelError, ChannelLink, ChannelManager, ConfigHandle, DeliverySettings,
    HostControl, HttpDelivery, Relay, RelayEvent, Router,
};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(relay_logging::initialize_for_tests);
}

#[derive(Default)]
struct RecordingHost {
    canceled: Mutex<Vec<HostDownloadId>>,
}

impl HostControl for RecordingHost {
    fn cancel(&self, id: HostDownloadId) {
        self.canceled.lock().unwrap().push(id);
    }
}

struct NotInstalled;

#[async_trait::async_trait]
impl ChannelConnector for NotInstalled {
    async fn open(&self) -> Result<ChannelLink, ChannelError> {
        Err(ChannelError::Connect("companion not registered".into()))
    }
}

fn relay_for(
    endpoint: &str,
    host: Arc<RecordingHost>,
) -> (Relay, mpsc::UnboundedReceiver<RelayEvent>) {
    let config = ConfigHandle::new(Configuration::new(
        true,
        endpoint,
        [".pdf", ".zip"],
        1_048_576,
    ));
    let router = Router::new(
        ChannelManager::new(Arc::new(NotInstalled)),
        HttpDelivery::new(DeliverySettings::default()).unwrap(),
        config.clone(),
    );
    Relay::new(config, router, host)
}

fn created(id: u64, url: &str, file_size: u64) -> HostDownloadEvent {
    HostDownloadEvent {
        id: HostDownloadId(id),
        url: url.to_string(),
        filename: None,
        file_size,
        referrer: Some("http://x/page".to_string()),
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<RelayEvent>) -> RelayEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event in time")
        .expect("event stream open")
}

#[tokio::test]
async fn accepted_download_is_canceled_and_routed_over_http() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let host = Arc::new(RecordingHost::default());
    let (relay, mut events) = relay_for(&server.uri(), host.clone());

    let handles = relay.on_download_created(created(11, "http://x/a.pdf", 2_000_000));
    assert_eq!(*host.canceled.lock().unwrap(), vec![HostDownloadId(11)]);
    assert_eq!(handles.len(), 1);

    let RelayEvent::Routed { origin, outcome, .. } = next_event(&mut events).await;
    assert_eq!(origin, JobOrigin::Intercepted(HostDownloadId(11)));
    assert_eq!(outcome.transport_used, Transport::Http);
    assert_eq!(relay.summary().delivered, 1);
}

#[tokio::test]
async fn unreachable_companion_leaves_download_canceled() {
    init_logging();
    let host = Arc::new(RecordingHost::default());
    let (relay, mut events) = relay_for("http://127.0.0.1:1", host.clone());

    relay.on_download_created(created(5, "http://x/a.zip", 0));
    let RelayEvent::Routed { outcome, .. } = next_event(&mut events).await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.transport_used, Transport::None);
    assert_eq!(*host.canceled.lock().unwrap(), vec![HostDownloadId(5)]);
    assert_eq!(relay.disposition(HostDownloadId(5)), Some(Disposition::Canceled));
    assert_eq!(relay.summary().failed, 1);

    // Later downloads are still intercepted after a failure.
    relay.on_download_created(created(6, "http://x/b.zip", 0));
    assert_eq!(
        *host.canceled.lock().unwrap(),
        vec![HostDownloadId(5), HostDownloadId(6)]
    );
}

#[tokio::test]
async fn rejected_download_is_left_to_the_host() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(0)
        .mount(&server)
        .await;

    let host = Arc::new(RecordingHost::default());
    let (relay, _events) = relay_for(&server.uri(), host.clone());

    let small = relay.on_download_created(created(1, "http://x/a.pdf", 1000));
    let wrong_type = relay.on_download_created(created(2, "http://x/a.html", 0));
    assert!(small.is_empty() && wrong_type.is_empty());
    assert!(host.canceled.lock().unwrap().is_empty());
    assert_eq!(relay.disposition(HostDownloadId(1)), Some(Disposition::Passthrough));
    assert_eq!(relay.summary().passthrough, 2);
}

#[tokio::test]
async fn run_consumes_a_download_source() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(2)
        .mount(&server)
        .await;

    let host = Arc::new(RecordingHost::default());
    let (relay, mut events) = relay_for(&server.uri(), host.clone());
    let (tx, rx) = mpsc::channel(8);
    tx.send(created(1, "http://x/1.pdf", 0)).await.unwrap();
    tx.send(created(2, "http://x/2.txt", 0)).await.unwrap();
    tx.send(created(3, "http://x/3.zip", 0)).await.unwrap();
    drop(tx);

    relay.run(rx).await;
    next_event(&mut events).await;
    next_event(&mut events).await;
    assert_eq!(
        *host.canceled.lock().unwrap(),
        vec![HostDownloadId(1), HostDownloadId(3)]
    );
}

#[tokio::test]
async fn get_all_links_routes_every_accepted_link() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(2)
        .mount(&server)
        .await;

    let host = Arc::new(RecordingHost::default());
    let (relay, mut events) = relay_for(&server.uri(), host);
    let reply = relay.handle_request(PageRequest::GetAllLinks {
        page: PageDocument {
            url: "http://x/list/".into(),
            html: r#"<a href="a.pdf">a</a><a href="b.html">b</a><a href="c.zip">c</a>"#.into(),
        },
    });
    assert_eq!(reply, PageResponse::ok_with_count(2));

    for _ in 0..2 {
        let RelayEvent::Routed { origin, outcome, .. } = next_event(&mut events).await;
        assert_eq!(origin, JobOrigin::PageScan);
        assert!(outcome.succeeded);
    }
}

#[tokio::test]
async fn explicit_requests_bypass_suffix_rules() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(3)
        .mount(&server)
        .await;

    let (relay, mut events) = relay_for(&server.uri(), Arc::new(RecordingHost::default()));

    let reply = relay.handle_request(PageRequest::DownloadUrl {
        url: "http://x/stream/live".into(),
        filename: None,
        referrer: Some("http://x/watch".into()),
    });
    assert_eq!(reply, PageResponse::ok());
    let RelayEvent::Routed { job, origin, .. } = next_event(&mut events).await;
    assert_eq!(origin, JobOrigin::UserAction);
    assert_eq!(job.filename.as_deref(), Some("live"));

    let reply = relay.handle_request(PageRequest::DownloadLinks {
        links: vec![
            LinkRequest {
                url: "http://x/1.html".into(),
                filename: Some("1.html".into()),
            },
            LinkRequest {
                url: "http://x/2.bin".into(),
                filename: None,
            },
        ],
        referrer: None,
    });
    assert_eq!(reply, PageResponse::ok_with_count(2));
    next_event(&mut events).await;
    next_event(&mut events).await;
}

#[tokio::test]
async fn config_requests_round_trip() {
    init_logging();
    let (relay, _events) = relay_for("http://127.0.0.1:1", Arc::new(RecordingHost::default()));

    let reply = relay.handle_request(PageRequest::SetConfig {
        config: PersistedConfig {
            enabled: Some(false),
            min_size: Some(4096),
            ..PersistedConfig::default()
        },
    });
    assert_eq!(reply, PageResponse::ok());

    let PageResponse::Config(current) = relay.handle_request(PageRequest::GetConfig) else {
        panic!("expected config reply");
    };
    assert_eq!(current.enabled, Some(false));
    assert_eq!(current.min_size, Some(4096));
    assert_eq!(current.server_url.as_deref(), Some("http://127.0.0.1:1"));
    assert_eq!(
        current.file_types,
        Some(vec![".pdf".to_string(), ".zip".to_string()])
    );

    // Disabled: user requests are dropped, nothing gets routed.
    assert!(relay
        .request_jobs(vec![relay_core::RoutingJob::new("http://x/a.pdf", None, None)])
        .is_empty());
}
