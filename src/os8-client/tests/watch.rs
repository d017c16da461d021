mod common;

use futures_util::StreamExt;

use os8_client::types::ResourceRef;
use os8_client::CallParams;
use os8_client::WatchFlow;

use common::test_client;
use common::StubServer;

const EVENT_LINES: &str = concat!(
    r#"{"type":"ADDED","object":{"metadata":{"namespace":"ns1","name":"pod1"}}}"#,
    "\n",
    r#"{"type":"MODIFIED","object":{"metadata":{"namespace":"ns1","name":"pod1"}}}"#,
    "\n",
    r#"{"type":"DELETED","object":{"metadata":{"namespace":"ns1","name":"pod1"}}}"#,
    "\n",
);

#[tokio::test]
async fn test_watch_decodes_event_stream() {
    let server = StubServer::start(vec![(200, EVENT_LINES)]).await;
    let client = test_client(server.url());

    let pods = ResourceRef::new("Pod", "v1").within("ns1").label("app");
    let stream = client
        .watch::<serde_json::Value, _>(&pods, &CallParams::default())
        .await
        .unwrap();
    let events: Vec<_> = stream.collect().await;

    let types: Vec<_> = events
        .into_iter()
        .map(|event| event.unwrap().type_name())
        .collect();
    assert_eq!(types, vec!["ADDED", "MODIFIED", "DELETED"]);

    let path = &server.requests()[0].path;
    assert!(path.starts_with("/api/v1/namespaces/ns1/pods?"), "path={path}");
    assert!(path.contains("watch=true"), "path={path}");
    assert!(path.contains("labelSelector=app"), "path={path}");
}

#[tokio::test]
async fn test_watch_forever_filters_event_types() {
    let server = StubServer::start(vec![(200, EVENT_LINES)]).await;
    let client = test_client(server.url());

    let pods = ResourceRef::new("Pod", "v1").within("ns1");
    let mut seen = Vec::new();
    client
        .watch_forever::<serde_json::Value, _, _>(
            &pods,
            &["ADDED", "DELETED"],
            &CallParams::default(),
            |event| {
                let name = event.type_name();
                seen.push(name);
                if name == "DELETED" {
                    WatchFlow::Stop
                } else {
                    WatchFlow::Continue
                }
            },
        )
        .await
        .unwrap();

    // MODIFIED never reaches the handler
    assert_eq!(seen, vec!["ADDED", "DELETED"]);
}

#[tokio::test]
async fn test_watch_forever_unfiltered_sees_everything() {
    let server = StubServer::start(vec![(200, EVENT_LINES)]).await;
    let client = test_client(server.url());

    let pods = ResourceRef::new("Pod", "v1").within("ns1");
    let mut seen = Vec::new();
    client
        .watch_forever::<serde_json::Value, _, _>(&pods, &[], &CallParams::default(), |event| {
            let name = event.type_name();
            seen.push(name);
            if name == "DELETED" {
                WatchFlow::Stop
            } else {
                WatchFlow::Continue
            }
        })
        .await
        .unwrap();

    assert_eq!(seen, vec!["ADDED", "MODIFIED", "DELETED"]);
}
