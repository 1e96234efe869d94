use pretty_assertions::assert_eq;
use relay_core::{
    Configuration, HostDownloadEvent, HostDownloadId, PageRequest, PageResponse, PersistedConfig,
    RoutingJob,
};
use serde_json::json;

#[test]
fn routing_job_wire_shape_uses_nulls() {
    let job = RoutingJob::new("http://x/a.pdf", None, Some("http://x/".into()));
    assert_eq!(
        serde_json::to_value(&job).unwrap(),
        json!({"url": "http://x/a.pdf", "filename": null, "referrer": "http://x/"})
    );
}

#[test]
fn page_requests_are_tagged_by_action() {
    let req: PageRequest = serde_json::from_value(json!({
        "action": "downloadUrl",
        "url": "http://x/v.mp4",
        "filename": "v.mp4"
    }))
    .unwrap();
    assert_eq!(
        req,
        PageRequest::DownloadUrl {
            url: "http://x/v.mp4".into(),
            filename: Some("v.mp4".into()),
            referrer: None,
        }
    );

    let req: PageRequest = serde_json::from_value(json!({"action": "getConfig"})).unwrap();
    assert_eq!(req, PageRequest::GetConfig);
}

#[test]
fn set_config_accepts_float_min_size() {
    let req: PageRequest = serde_json::from_value(json!({
        "action": "setConfig",
        "config": {"enabled": false, "minSize": 2048.7, "fileTypes": ["PDF"]}
    }))
    .unwrap();
    let PageRequest::SetConfig { config } = req else {
        panic!("expected setConfig");
    };
    let next = Configuration::default().with_update(&config);
    assert!(!next.enabled);
    assert_eq!(next.min_size_bytes, 2048);
    assert_eq!(next.accepted_suffixes(), [".pdf".to_string()]);
}

#[test]
fn get_config_reply_uses_persisted_keys() {
    let config = Configuration::new(true, "http://h:1", [".zip"], 10);
    let reply = serde_json::to_value(PageResponse::Config(config.to_persisted())).unwrap();
    assert_eq!(
        reply,
        json!({"enabled": true, "serverUrl": "http://h:1", "fileTypes": [".zip"], "minSize": 10})
    );
    assert_eq!(
        serde_json::to_value(PageResponse::ok_with_count(2)).unwrap(),
        json!({"success": true, "count": 2})
    );
    let negative: PersistedConfig = serde_json::from_value(json!({"minSize": -5})).unwrap();
    assert_eq!(negative.min_size, Some(0));
}

#[test]
fn host_events_tolerate_unknown_size_markers() {
    let event: HostDownloadEvent = serde_json::from_value(json!({
        "id": 12,
        "url": "http://x/a.iso",
        "fileSize": -1
    }))
    .unwrap();
    assert_eq!(event.id, HostDownloadId(12));
    assert_eq!(event.file_size, 0);
    assert_eq!(event.filename, None);

    let event: HostDownloadEvent =
        serde_json::from_value(json!({"id": 13, "url": "http://x/b.iso", "fileSize": 2048.0}))
            .unwrap();
    assert_eq!(event.file_size, 2048);
}
