#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use hyper::body::to_bytes;
use hyper::service::make_service_fn;
use hyper::service::service_fn;
use hyper::Body;
use hyper::Request;
use hyper::Response;
use hyper::Server;
use hyper::StatusCode;

use os8_client::ClientConfig;
use os8_client::K8Client;
use os8_client::StaticTokenFetcher;
use os8_client::TokenFetcher;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn json_body(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("recorded body is not json")
    }
}

/// in process api server stub serving a scripted response sequence. The
/// last scripted response repeats once the script is exhausted.
#[derive(Clone)]
pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    pub async fn start(script: Vec<(u16, &str)>) -> Self {
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::new(Mutex::new(Vec::new()));
        let script: Arc<Mutex<VecDeque<(u16, String)>>> = Arc::new(Mutex::new(
            script
                .into_iter()
                .map(|(status, body)| (status, body.to_owned()))
                .collect(),
        ));

        let recorded = requests.clone();
        let make = make_service_fn(move |_| {
            let requests = recorded.clone();
            let script = script.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |request| {
                    handle(requests.clone(), script.clone(), request)
                }))
            }
        });

        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make);
        let addr = server.local_addr();
        tokio::spawn(server);
        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle(
    requests: Arc<Mutex<Vec<Recorded>>>,
    script: Arc<Mutex<VecDeque<(u16, String)>>>,
    request: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let method = request.method().to_string();
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_default();
    let authorization = request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let body = to_bytes(request.into_body()).await.unwrap_or_default().to_vec();

    requests.lock().unwrap().push(Recorded {
        method,
        path,
        authorization,
        body,
    });

    let (status, body) = {
        let mut script = script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script
                .front()
                .cloned()
                .unwrap_or((200, "{}".to_owned()))
        }
    };

    Ok(Response::builder()
        .status(StatusCode::from_u16(status).unwrap())
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap())
}

pub fn fast_config(url: String) -> ClientConfig {
    let mut config = ClientConfig::with_url(url);
    config.ca_location = None;
    config.retry.min = Duration::from_millis(1);
    config.retry.max = Duration::from_millis(5);
    config
}

pub fn test_client(url: String) -> K8Client {
    K8Client::builder(fast_config(url))
        .token_fetcher(StaticTokenFetcher::new("secret"))
        .build()
        .unwrap()
}

pub fn test_client_with<F: TokenFetcher + 'static>(url: String, fetcher: F) -> K8Client {
    K8Client::builder(fast_config(url))
        .token_fetcher(fetcher)
        .build()
        .unwrap()
}
