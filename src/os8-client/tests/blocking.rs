mod common;

use tokio::runtime::Builder;
use tokio::runtime::Runtime;

use os8_client::types::ResourceRef;
use os8_client::BlockingClient;
use os8_client::CallParams;
use os8_client::WatchFlow;

use common::test_client;
use common::StubServer;

// the stub server needs its own runtime since the blocking client drives
// requests on an internal one
fn server_runtime() -> Runtime {
    Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn test_blocking_get() {
    let rt = server_runtime();
    let server = rt.block_on(StubServer::start(vec![(
        200,
        r#"{"metadata":{"namespace":"ns1","name":"pod1"}}"#,
    )]));
    let client = BlockingClient::new(test_client(server.url())).unwrap();

    let pod = ResourceRef::new("Pod", "v1").within("ns1").named("pod1");
    let found: serde_json::Value = client.get(&pod, &CallParams::default()).unwrap();

    assert_eq!(found["metadata"]["name"], "pod1");
    assert_eq!(server.requests()[0].path, "/api/v1/namespaces/ns1/pods/pod1");
}

#[test]
fn test_blocking_proxy_get() {
    let rt = server_runtime();
    let server = rt.block_on(StubServer::start(vec![(200, r#"{"status":"UP"}"#)]));
    let client = BlockingClient::new(test_client(server.url())).unwrap();

    let pod = ResourceRef::new("Pod", "v1").within("ns1").named("pod1");
    let health: serde_json::Value = client
        .proxy_get(&pod, 8081, "actuator/health", &[], &CallParams::default())
        .unwrap();

    assert_eq!(health["status"], "UP");
    assert_eq!(
        server.requests()[0].path,
        "/api/v1/namespaces/ns1/pods/pod1:8081/proxy/actuator/health"
    );
}

#[test]
fn test_blocking_watch_stops_on_request() {
    let rt = server_runtime();
    let server = rt.block_on(StubServer::start(vec![(
        200,
        "{\"type\":\"ADDED\",\"object\":{\"metadata\":{\"name\":\"pod1\"}}}\n",
    )]));
    let client = BlockingClient::new(test_client(server.url())).unwrap();

    let pods = ResourceRef::new("Pod", "v1").within("ns1");
    let mut seen = Vec::new();
    client
        .watch_forever::<serde_json::Value, _, _>(&pods, &[], &CallParams::default(), |event| {
            seen.push(event.type_name());
            WatchFlow::Stop
        })
        .unwrap();

    assert_eq!(seen, vec!["ADDED"]);
}
