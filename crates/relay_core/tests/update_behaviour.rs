use std::sync::Once;

use pretty_assertions::assert_eq;
use relay_core::{
    update, Configuration, ControllerState, DeliveryOutcome, Disposition, Effect,
    HostDownloadEvent, HostDownloadId, JobOrigin, Msg, RoutingJob,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(relay_logging::initialize_for_tests);
}

fn created(id: u64, url: &str, filename: &str, file_size: u64) -> Msg {
    Msg::DownloadCreated(HostDownloadEvent {
        id: HostDownloadId(id),
        url: url.to_string(),
        filename: Some(filename.to_string()),
        file_size,
        referrer: Some("http://x/page".to_string()),
    })
}

#[test]
fn accepted_download_is_canceled_before_routing() {
    init_logging();
    let config = Configuration::default();
    let (state, effects) = update(
        ControllerState::new(),
        &config,
        created(7, "http://x/a.pdf", "/tmp/a.pdf", 5_000_000),
    );

    assert_eq!(
        effects,
        vec![
            Effect::CancelHostDownload {
                id: HostDownloadId(7)
            },
            Effect::Route {
                origin: JobOrigin::Intercepted(HostDownloadId(7)),
                job: RoutingJob {
                    url: "http://x/a.pdf".to_string(),
                    filename: Some("/tmp/a.pdf".to_string()),
                    referrer: Some("http://x/page".to_string()),
                },
            },
        ]
    );
    assert_eq!(state.disposition(HostDownloadId(7)), Some(Disposition::Canceled));
}

#[test]
fn rejected_download_passes_through() {
    init_logging();
    let config = Configuration::default();
    let (state, effects) = update(
        ControllerState::new(),
        &config,
        created(1, "http://x/page.html", "page.html", 0),
    );
    assert!(effects.is_empty());
    assert_eq!(state.disposition(HostDownloadId(1)), Some(Disposition::Passthrough));
}

#[test]
fn failed_route_keeps_download_canceled() {
    init_logging();
    let config = Configuration::default();
    let (state, _) = update(
        ControllerState::new(),
        &config,
        created(3, "http://x/a.zip", "a.zip", 0),
    );
    let (state, effects) = update(
        state,
        &config,
        Msg::RouteFinished {
            origin: JobOrigin::Intercepted(HostDownloadId(3)),
            outcome: DeliveryOutcome::failed("connection refused"),
        },
    );
    assert!(effects.is_empty());

    let record = state.record(HostDownloadId(3)).unwrap();
    assert_eq!(record.disposition, Disposition::Canceled);
    assert_eq!(record.outcome.as_ref().map(|o| o.succeeded), Some(false));
    assert_eq!(state.summary().failed, 1);

    // A duplicate notification for the same download never resurrects or re-routes it.
    let (state, effects) = update(state, &config, created(3, "http://x/a.zip", "a.zip", 0));
    assert!(effects.is_empty());
    assert_eq!(state.disposition(HostDownloadId(3)), Some(Disposition::Canceled));
}

#[test]
fn user_jobs_bypass_filters_but_not_disabled() {
    init_logging();
    let job = RoutingJob::new("http://x/stream", None, None);
    let config = Configuration::default();
    let (_, effects) = update(
        ControllerState::new(),
        &config,
        Msg::JobsRequested(vec![job.clone()]),
    );
    assert_eq!(
        effects,
        vec![Effect::Route {
            origin: JobOrigin::UserAction,
            job: job.clone(),
        }]
    );

    let mut disabled = Configuration::default();
    disabled.enabled = false;
    let (_, effects) = update(ControllerState::new(), &disabled, Msg::JobsRequested(vec![job]));
    assert!(effects.is_empty());
}

#[test]
fn scanned_jobs_are_routed_in_order() {
    init_logging();
    let jobs = vec![
        RoutingJob::new("http://x/1.pdf", Some("1.pdf".into()), None),
        RoutingJob::new("http://x/2.pdf", Some("2.pdf".into()), None),
    ];
    let (_, effects) = update(
        ControllerState::new(),
        &Configuration::default(),
        Msg::PageScanned(jobs),
    );
    let urls: Vec<_> = effects
        .iter()
        .map(|effect| match effect {
            Effect::Route { job, origin } => {
                assert_eq!(*origin, JobOrigin::PageScan);
                job.url.as_str()
            }
            other => panic!("unexpected effect {other:?}"),
        })
        .collect();
    assert_eq!(urls, vec!["http://x/1.pdf", "http://x/2.pdf"]);
}
