//! Request execution and retry.
//!
//! One logical call is a strictly sequential attempt loop: send, classify,
//! back off, send again. 404 is not an error at this layer, it maps to an
//! empty outcome and the caller decides whether that is acceptable.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::HeaderName;
use http::header::HeaderValue;
use http::header::ACCEPT;
use http::header::AUTHORIZATION;
use http::header::CONTENT_TYPE;
use http::header::USER_AGENT;
use http::Method;
use http::StatusCode;
use http::Uri;
use hyper::client::connect::HttpConnector;
use hyper::Body;
use hyper::Client;
use hyper::Request;
use hyper_rustls::HttpsConnector;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tokio::time::timeout;
use tracing::debug;
use tracing::error;
use tracing::trace;

use os8_config::RetryConfiguration;
use os8_types::Status;

use crate::token::TokenFetcher;
use crate::{ClientError, Result};

pub(crate) type HyperHttpsClient = Client<HttpsConnector<HttpConnector>>;

/// which failures are transient for a given call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryWhen {
    /// 5xx responses and transport failures (the default)
    ServerAndTransport,
    /// transport failures only, response errors are terminal. Used for proxy
    /// and sub resource calls where a 5xx comes from the proxied application
    /// rather than the api server.
    TransportOnly,
}

/// one logical call, everything the executor needs to build and classify it
pub(crate) struct Call {
    pub method: Method,
    /// expanded path including any query string
    pub path: String,
    pub body: Option<Vec<u8>>,
    pub headers: Vec<(String, String)>,
    /// diagnostics only, never control flow
    pub context: String,
    pub token: Option<String>,
    pub audience: Option<String>,
    pub retry_when: RetryWhen,
    pub unauthorized_as_empty: bool,
}

impl Call {
    pub fn new<S: Into<String>>(method: Method, path: String, context: S) -> Self {
        Self {
            method,
            path,
            body: None,
            headers: Vec::new(),
            context: context.into(),
            token: None,
            audience: None,
            retry_when: RetryWhen::ServerAndTransport,
            unauthorized_as_empty: false,
        }
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json_body<B: serde::Serialize + ?Sized>(self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body)?;
        Ok(self.body(bytes))
    }

    pub fn headers(mut self, headers: &[(&str, &str)]) -> Self {
        for (key, value) in headers {
            self.headers.push(((*key).to_owned(), (*value).to_owned()));
        }
        self
    }

    pub fn token(mut self, token: Option<&str>) -> Self {
        self.token = token.map(str::to_owned);
        self
    }

    pub fn audience(mut self, audience: Option<&str>) -> Self {
        self.audience = audience.map(str::to_owned);
        self
    }

    pub fn retry_when(mut self, when: RetryWhen) -> Self {
        self.retry_when = when;
        self
    }

    pub fn unauthorized_as_empty(mut self) -> Self {
        self.unauthorized_as_empty = true;
        self
    }
}

/// executes calls against one api server with bearer auth and bounded retry
pub(crate) struct RequestExecutor {
    client: HyperHttpsClient,
    host: String,
    token_fetcher: Arc<dyn TokenFetcher>,
    retry: RetryConfiguration,
    request_timeout: Duration,
    user_agent: String,
}

impl RequestExecutor {
    pub fn new(
        client: HyperHttpsClient,
        host: String,
        token_fetcher: Arc<dyn TokenFetcher>,
        retry: RetryConfiguration,
        request_timeout: Duration,
        user_agent: String,
    ) -> Self {
        Self {
            client,
            host,
            token_fetcher,
            retry,
            request_timeout,
            user_agent,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// execute with retry and decode. `Ok(None)` is the not-found outcome
    /// (or 401 when the call asked for unauthorized-as-empty).
    pub async fn execute<T>(&self, call: &Call) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let mut attempt: u32 = 0;
        loop {
            match self.attempt(call).await {
                Ok(None) => return Ok(None),
                Ok(Some(bytes)) => {
                    return serde_json::from_slice(&bytes)
                        .map(Some)
                        .map_err(|err| {
                            error!("json error: {}", err);
                            error!("source: {}", String::from_utf8_lossy(&bytes));
                            err.into()
                        });
                }
                Err(err) => {
                    let retryable = match call.retry_when {
                        RetryWhen::ServerAndTransport => {
                            err.is_server_error() || err.is_transport_error()
                        }
                        RetryWhen::TransportOnly => err.is_transport_error(),
                    };
                    if !retryable || attempt >= self.retry.times {
                        error!(
                            context = %call.context,
                            method = %call.method,
                            path = %call.path,
                            %err,
                            "request failed"
                        );
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = backoff_delay(&self.retry, attempt);
                    debug!(
                        times = attempt,
                        context = %call.context,
                        method = %call.method,
                        path = %call.path,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "retrying failed request"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// single attempt: build, send, classify
    async fn attempt(&self, call: &Call) -> Result<Option<Bytes>> {
        let request = self.build_request(call).await?;
        let uri = request.uri().clone();
        trace!(method = %call.method, %uri, "sending request");

        let exchange = async {
            let response = self.client.request(request).await?;
            let status = response.status();
            let bytes = hyper::body::to_bytes(response.into_body()).await?;
            Ok::<_, ClientError>((status, bytes))
        };
        let (status, bytes) = timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout {
                method: call.method.clone(),
                uri: uri.to_string(),
            })??;

        if status.is_success() {
            trace!(%status, "success response: {}", String::from_utf8_lossy(&bytes));
            return Ok(Some(bytes));
        }
        if status == StatusCode::NOT_FOUND {
            trace!(method = %call.method, %uri, "resource not found");
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED && call.unauthorized_as_empty {
            debug!(method = %call.method, %uri, "unauthorized mapped to empty");
            return Ok(None);
        }

        trace!(%status, "error response received");
        Err(ClientError::Api {
            status,
            method: call.method.clone(),
            uri: uri.to_string(),
            message: status_message(&bytes),
        })
    }

    /// open the response body as a raw stream, no retry and no read timeout.
    /// Used by the watch layer.
    pub async fn stream(&self, call: &Call) -> Result<Body> {
        let request = self.build_request(call).await?;
        let uri = request.uri().clone();
        debug!(%uri, "opening stream");

        let response = self.client.request(request).await?;
        let status = response.status();
        if !status.is_success() {
            let bytes = hyper::body::to_bytes(response.into_body()).await?;
            return Err(ClientError::Api {
                status,
                method: call.method.clone(),
                uri: uri.to_string(),
                message: status_message(&bytes),
            });
        }
        Ok(response.into_body())
    }

    async fn build_request(&self, call: &Call) -> Result<Request<Body>> {
        let uri: Uri = format!("{}{}", self.host, call.path).parse()?;

        let body = match &call.body {
            Some(bytes) => Body::from(bytes.clone()),
            None => Body::empty(),
        };
        let mut request = Request::builder()
            .method(call.method.clone())
            .uri(uri)
            .body(body)?;

        let headers = request.headers_mut();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.user_agent)?);
        if call.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (key, value) in &call.headers {
            headers.insert(
                HeaderName::from_bytes(key.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        let token = match &call.token {
            Some(token) => Some(token.clone()),
            None => self.token_fetcher.token(call.audience.as_deref()).await?,
        };
        if let Some(token) = token {
            let bearer = format!("Bearer {token}");
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&bearer)?);
        }

        Ok(request)
    }
}

/// exponential backoff starting at `min`, capped at `max`
fn backoff_delay(retry: &RetryConfiguration, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    retry
        .min
        .checked_mul(1u32 << shift)
        .map(|delay| delay.min(retry.max))
        .unwrap_or(retry.max)
}

fn status_message(bytes: &Bytes) -> String {
    serde_json::from_slice::<Status>(bytes)
        .ok()
        .and_then(|status| status.message)
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod test {

    use std::time::Duration;

    use os8_config::RetryConfiguration;

    use super::backoff_delay;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let retry = RetryConfiguration::default();
        assert_eq!(backoff_delay(&retry, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(&retry, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(&retry, 3), Duration::from_millis(400));
        assert_eq!(backoff_delay(&retry, 4), Duration::from_millis(800));
        assert_eq!(backoff_delay(&retry, 5), Duration::from_secs(1));
        assert_eq!(backoff_delay(&retry, 30), Duration::from_secs(1));
    }
}
