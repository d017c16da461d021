mod common;

use os8_client::types::ResourceRef;
use os8_client::CallParams;
use os8_client::K8Client;
use os8_client::StaticTokenFetcher;

use common::fast_config;
use common::StubServer;

const POD_BODY: &str = r#"{"metadata":{"namespace":"ns1","name":"pod1"}}"#;
const SERVER_ERROR: &str = r#"{"kind":"Status","code":503,"message":"overloaded"}"#;

fn descriptor() -> ResourceRef {
    ResourceRef::new("Pod", "v1").within("ns1").named("pod1")
}

#[tokio::test]
async fn test_server_errors_are_retried_until_success() {
    let server = StubServer::start(vec![
        (503, SERVER_ERROR),
        (503, SERVER_ERROR),
        (503, SERVER_ERROR),
        (200, POD_BODY),
    ])
    .await;
    let client = common::test_client(server.url());

    let pod: serde_json::Value = client
        .get(&descriptor(), &CallParams::default())
        .await
        .unwrap();
    assert_eq!(pod["metadata"]["name"], "pod1");

    // initial attempt plus three retries
    assert_eq!(server.requests().len(), 4);
}

#[tokio::test]
async fn test_retries_exhausted_propagates_server_error() {
    let server = StubServer::start(vec![(503, SERVER_ERROR)]).await;
    let mut config = fast_config(server.url());
    config.retry.times = 2;
    let client = K8Client::builder(config)
        .token_fetcher(StaticTokenFetcher::new("secret"))
        .build()
        .unwrap();

    let result: Result<serde_json::Value, _> =
        client.get(&descriptor(), &CallParams::default()).await;

    let err = result.unwrap_err();
    assert!(err.is_server_error());
    assert!(err.to_string().contains("overloaded"));
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn test_client_errors_are_never_retried() {
    let server = StubServer::start(vec![(400, r#"{"kind":"Status","code":400}"#)]).await;
    let client = common::test_client(server.url());

    let result: Result<serde_json::Value, _> =
        client.get(&descriptor(), &CallParams::default()).await;

    assert!(result.unwrap_err().is_client_error());
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_zero_times_disables_retry() {
    let server = StubServer::start(vec![(503, SERVER_ERROR)]).await;
    let mut config = fast_config(server.url());
    config.retry.times = 0;
    let client = K8Client::builder(config)
        .token_fetcher(StaticTokenFetcher::new("secret"))
        .build()
        .unwrap();

    let result: Result<serde_json::Value, _> =
        client.get(&descriptor(), &CallParams::default()).await;

    assert!(result.unwrap_err().is_server_error());
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_proxy_does_not_retry_response_errors() {
    let server = StubServer::start(vec![(503, SERVER_ERROR)]).await;
    let client = common::test_client(server.url());

    let result: Result<serde_json::Value, _> = client
        .proxy_get(&descriptor(), 8081, "/health", &[], &CallParams::default())
        .await;

    // the 5xx comes from the proxied application, it is terminal here
    assert!(result.unwrap_err().is_server_error());
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_transport_failure_is_retried() {
    // nothing listens on this port, every attempt fails below the http layer
    let mut config = fast_config("http://127.0.0.1:9".to_owned());
    config.retry.times = 2;
    let client = K8Client::builder(config)
        .token_fetcher(StaticTokenFetcher::new("secret"))
        .build()
        .unwrap();

    let result: Result<serde_json::Value, _> =
        client.get(&descriptor(), &CallParams::default()).await;

    let err = result.unwrap_err();
    assert!(err.is_transport_error(), "err={err}");
}
