use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use http::Method;
use hyper::client::connect::HttpConnector;
use hyper::Client;
use hyper_rustls::HttpsConnectorBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use os8_config::ClientConfig;
use os8_types::options::DeleteOptions;
use os8_types::options::ListOptions;
use os8_types::options::PropagationPolicy;
use os8_types::DeploymentConfig;
use os8_types::DeploymentRequest;
use os8_types::HasIdentity;
use os8_types::ResourceList;
use os8_types::Scale;
use os8_types::Status;
use os8_types::User;

use crate::exec::Call;
use crate::exec::HyperHttpsClient;
use crate::exec::RequestExecutor;
use crate::exec::RetryWhen;
use crate::token::FileTokenFetcher;
use crate::token::NoopTokenFetcher;
use crate::token::PsatTokenFetcher;
use crate::token::StaticTokenFetcher;
use crate::token::TokenFetcher;
use crate::uri::collection_uri;
use crate::uri::label_selector;
use crate::uri::resource_uri;
use crate::uri::resource_uri_with;
use crate::uri::OpenShiftApiGroup;
use crate::{ClientError, Result};

/// per call overrides. An explicit token wins over the configured fetcher,
/// the audience is passed through to fetchers that scope tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallParams<'a> {
    pub token: Option<&'a str>,
    pub audience: Option<&'a str>,
}

impl<'a> CallParams<'a> {
    pub fn token(token: &'a str) -> Self {
        Self {
            token: Some(token),
            audience: None,
        }
    }

    pub fn audience(audience: &'a str) -> Self {
        Self {
            token: None,
            audience: Some(audience),
        }
    }
}

/// OpenShift cluster accessible through the REST api.
///
/// Stateless per request beyond its immutable configuration, cheap to clone,
/// arbitrarily many calls may be in flight concurrently.
#[derive(Clone)]
pub struct K8Client {
    pub(crate) executor: Arc<RequestExecutor>,
}

pub type SharedK8Client = Arc<K8Client>;

impl K8Client {
    /// simple constructor with a fixed token, mainly useful for tests
    pub fn new<S: Into<String>>(url: S, token: S) -> Result<Self> {
        Self::builder(ClientConfig::with_url(url))
            .token_fetcher(StaticTokenFetcher::new(token))
            .build()
    }

    pub fn builder(config: ClientConfig) -> K8ClientBuilder {
        K8ClientBuilder::new(config)
    }

    fn context<R>(op: &str, resource: &R) -> String
    where
        R: HasIdentity + ?Sized,
    {
        format!(
            "{op} {}/{}/{}",
            resource.kind(),
            resource.namespace().unwrap_or(""),
            resource.name().unwrap_or("")
        )
    }

    /// get a single resource, 404 maps to `None`
    pub async fn get_or_null<K, R>(&self, resource: &R, params: &CallParams<'_>) -> Result<Option<K>>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
    {
        let path = resource_uri(resource).expand();
        let call = Call::new(Method::GET, path, Self::context("get", resource))
            .token(params.token)
            .audience(params.audience);
        self.executor.execute(&call).await
    }

    /// get a single resource that must exist
    pub async fn get<K, R>(&self, resource: &R, params: &CallParams<'_>) -> Result<K>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
    {
        self.get_or_null(resource, params)
            .await?
            .ok_or_else(|| ClientError::not_found(resource))
    }

    /// list resources matching the descriptor's namespace and labels.
    /// The descriptor's name is always ignored for list operations. 404 maps
    /// to an empty list.
    pub async fn get_many<K, R>(&self, resource: &R, params: &CallParams<'_>) -> Result<Vec<K>>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
    {
        let mut path = collection_uri(resource).expand();
        let labels = resource.labels();
        if !labels.is_empty() {
            let query = ListOptions {
                label_selector: Some(label_selector(labels)),
                ..Default::default()
            };
            path = format!("{path}?{}", serde_qs::to_string(&query)?);
        }

        let call = Call::new(Method::GET, path, Self::context("get many", resource))
            .token(params.token)
            .audience(params.audience);
        let list: Option<ResourceList<K>> = self.executor.execute(&call).await?;
        Ok(list.map(|list| list.items).unwrap_or_default())
    }

    /// create a resource, body is the resource itself
    pub async fn post<K>(&self, resource: &K, params: &CallParams<'_>) -> Result<K>
    where
        K: HasIdentity + Serialize + DeserializeOwned,
    {
        self.post_with_body(resource, resource, params).await
    }

    /// create with an explicit body, addressed by the descriptor
    pub async fn post_with_body<K, R, B>(
        &self,
        resource: &R,
        body: &B,
        params: &CallParams<'_>,
    ) -> Result<K>
    where
        R: HasIdentity + ?Sized,
        B: Serialize + ?Sized,
        K: DeserializeOwned,
    {
        let path = collection_uri(resource).expand();
        let call = Call::new(Method::POST, path, Self::context("post", resource))
            .json_body(body)?
            .token(params.token)
            .audience(params.audience);
        self.executor
            .execute(&call)
            .await?
            .ok_or_else(|| ClientError::not_found(resource))
    }

    /// replace a resource, body defaults to the resource itself
    pub async fn put<K>(&self, resource: &K, params: &CallParams<'_>) -> Result<K>
    where
        K: HasIdentity + Serialize + DeserializeOwned,
    {
        self.put_with_body(resource, resource, params).await
    }

    pub async fn put_with_body<K, R, B>(
        &self,
        resource: &R,
        body: &B,
        params: &CallParams<'_>,
    ) -> Result<K>
    where
        R: HasIdentity + ?Sized,
        B: Serialize + ?Sized,
        K: DeserializeOwned,
    {
        let path = resource_uri(resource).expand();
        let call = Call::new(Method::PUT, path, Self::context("put", resource))
            .json_body(body)?
            .token(params.token)
            .audience(params.audience);
        self.executor
            .execute(&call)
            .await?
            .ok_or_else(|| ClientError::not_found(resource))
    }

    /// delete waiting for dependents to go away first, returns the resource
    pub async fn delete_foreground<K, R>(
        &self,
        resource: &R,
        options: Option<DeleteOptions>,
        params: &CallParams<'_>,
    ) -> Result<K>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
    {
        self.delete(resource, options, PropagationPolicy::Foreground, params)
            .await
    }

    /// delete leaving dependents behind, returns the resource
    pub async fn delete_orphan<K, R>(
        &self,
        resource: &R,
        options: Option<DeleteOptions>,
        params: &CallParams<'_>,
    ) -> Result<K>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
    {
        self.delete(resource, options, PropagationPolicy::Orphan, params)
            .await
    }

    /// asynchronous delete, the server answers with a status body
    pub async fn delete_background<R>(
        &self,
        resource: &R,
        options: Option<DeleteOptions>,
        params: &CallParams<'_>,
    ) -> Result<Status>
    where
        R: HasIdentity + ?Sized,
    {
        self.delete(resource, options, PropagationPolicy::Background, params)
            .await
    }

    async fn delete<T, R>(
        &self,
        resource: &R,
        options: Option<DeleteOptions>,
        policy: PropagationPolicy,
        params: &CallParams<'_>,
    ) -> Result<T>
    where
        R: HasIdentity + ?Sized,
        T: DeserializeOwned,
    {
        let body = options
            .unwrap_or_default()
            .with_propagation_policy(policy);
        let path = resource_uri(resource).expand();
        let context = Self::context(&format!("delete {policy:?}").to_lowercase(), resource);
        let call = Call::new(Method::DELETE, path, context)
            .json_body(&body)?
            .token(params.token)
            .audience(params.audience);
        self.executor
            .execute(&call)
            .await?
            .ok_or_else(|| ClientError::not_found(resource))
    }

    /// request routed through the api server's pod proxy sub resource
    pub async fn proxy_get<T, R>(
        &self,
        pod: &R,
        port: u16,
        path: &str,
        headers: &[(&str, &str)],
        params: &CallParams<'_>,
    ) -> Result<T>
    where
        R: HasIdentity + ?Sized,
        T: DeserializeOwned,
    {
        self.proxy(Method::GET, pod, port, path, headers, None::<&()>, params)
            .await
    }

    pub async fn proxy_post<T, R, B>(
        &self,
        pod: &R,
        port: u16,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<&B>,
        params: &CallParams<'_>,
    ) -> Result<T>
    where
        R: HasIdentity + ?Sized,
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.proxy(Method::POST, pod, port, path, headers, body, params)
            .await
    }

    pub async fn proxy_delete<T, R>(
        &self,
        pod: &R,
        port: u16,
        path: &str,
        headers: &[(&str, &str)],
        params: &CallParams<'_>,
    ) -> Result<T>
    where
        R: HasIdentity + ?Sized,
        T: DeserializeOwned,
    {
        self.proxy(Method::DELETE, pod, port, path, headers, None::<&()>, params)
            .await
    }

    async fn proxy<T, R, B>(
        &self,
        method: Method,
        pod: &R,
        port: u16,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<&B>,
        params: &CallParams<'_>,
    ) -> Result<T>
    where
        R: HasIdentity + ?Sized,
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let proxy_path = if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        };
        let uri = resource_uri_with(
            pod,
            ":{port}/proxy{path}",
            &[("port", port.to_string()), ("path", proxy_path.clone())],
        );
        let context = format!(
            "proxy {}/{}:{port}{proxy_path}",
            pod.namespace().unwrap_or(""),
            pod.name().unwrap_or("")
        );

        let mut call = Call::new(method, uri.expand(), context)
            .headers(headers)
            .token(params.token)
            .audience(params.audience)
            .retry_when(RetryWhen::TransportOnly);
        if let Some(body) = body {
            call = call.json_body(body)?;
        }
        self.executor
            .execute(&call)
            .await?
            .ok_or_else(|| ClientError::not_found(pod))
    }

    /// set the replica count through the deploymentconfig scale sub resource
    pub async fn scale_deployment_config(
        &self,
        namespace: &str,
        name: &str,
        count: i32,
        params: &CallParams<'_>,
    ) -> Result<Scale> {
        let uri = OpenShiftApiGroup::DeploymentConfigScale.uri(Some(namespace), Some(name));
        let scale = Scale::new(namespace, name, count);
        let call = Call::new(
            Method::PUT,
            uri.expand(),
            format!("scale deploymentconfig {namespace}/{name}"),
        )
        .json_body(&scale)?
        .token(params.token)
        .audience(params.audience);
        self.executor.execute(&call).await?.ok_or_else(|| {
            ClientError::not_found(&DeploymentConfig::named(namespace, name))
        })
    }

    /// trigger a new rollout through the instantiate sub resource
    pub async fn rollout_deployment_config(
        &self,
        namespace: &str,
        name: &str,
        params: &CallParams<'_>,
    ) -> Result<DeploymentConfig> {
        let uri = OpenShiftApiGroup::DeploymentRequest.uri(Some(namespace), Some(name));
        let request = DeploymentRequest::latest(name);
        let call = Call::new(
            Method::POST,
            uri.expand(),
            format!("rollout deploymentconfig {namespace}/{name}"),
        )
        .json_body(&request)?
        .token(params.token)
        .audience(params.audience);
        self.executor.execute(&call).await?.ok_or_else(|| {
            ClientError::not_found(&DeploymentConfig::named(namespace, name))
        })
    }

    /// who does this token belong to. 401 signals "no valid session" and
    /// maps to `None` rather than an error.
    pub async fn current_user(&self, token: &str) -> Result<Option<User>> {
        let uri = OpenShiftApiGroup::User.uri(None, None);
        let call = Call::new(Method::GET, uri.expand(), "get current user")
            .token(Some(token))
            .unauthorized_as_empty();
        self.executor.execute(&call).await
    }
}

/// builds the https transport and wires the token source
pub struct K8ClientBuilder {
    config: ClientConfig,
    token_fetcher: Option<Arc<dyn TokenFetcher>>,
    user_agent: String,
}

impl K8ClientBuilder {
    fn new(config: ClientConfig) -> Self {
        Self {
            config,
            token_fetcher: None,
            user_agent: format!("os8-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn token_fetcher<F>(mut self, fetcher: F) -> Self
    where
        F: TokenFetcher + 'static,
    {
        self.token_fetcher = Some(Arc::new(fetcher));
        self
    }

    /// read the mounted service account token per request
    pub fn service_account(mut self) -> Self {
        self.token_fetcher = Some(Arc::new(FileTokenFetcher::new(
            self.config.token_location.clone(),
        )));
        self
    }

    /// projected audience scoped tokens under the given mount directory
    pub fn psat<P: Into<PathBuf>>(mut self, mount: P) -> Self {
        self.token_fetcher = Some(Arc::new(PsatTokenFetcher::new(mount)));
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<K8Client> {
        let host = self.config.url.trim_end_matches('/').to_owned();
        debug!(url = %host, "building client");

        let client = build_https_client(&self.config)?;
        let token_fetcher = self
            .token_fetcher
            .unwrap_or_else(|| Arc::new(NoopTokenFetcher));

        // the whole exchange (send plus read) runs under one timer
        let request_timeout = self.config.timeout.read + self.config.timeout.write;
        let executor = RequestExecutor::new(
            client,
            host,
            token_fetcher,
            self.config.retry.clone(),
            request_timeout,
            self.user_agent,
        );
        Ok(K8Client {
            executor: Arc::new(executor),
        })
    }
}

fn build_https_client(config: &ClientConfig) -> Result<HyperHttpsClient> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(config.timeout.connect));

    let ca = config
        .ca_location
        .as_deref()
        .filter(|path| Path::new(path).exists());
    let connector = match ca {
        Some(path) => {
            debug!(path, "loading cluster ca bundle");
            let mut roots = rustls::RootCertStore::empty();
            let file = File::open(path)?;
            let mut reader = BufReader::new(file);
            for cert in rustls_pemfile::certs(&mut reader)? {
                roots
                    .add(&rustls::Certificate(cert))
                    .map_err(|err| ClientError::Tls(err.to_string()))?;
            }
            let tls = rustls::ClientConfig::builder()
                .with_safe_defaults()
                .with_root_certificates(roots)
                .with_no_client_auth();
            HttpsConnectorBuilder::new()
                .with_tls_config(tls)
                .https_or_http()
                .enable_http1()
                .wrap_connector(http)
        }
        None => HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http),
    };

    Ok(Client::builder()
        .pool_max_idle_per_host(config.max_connections)
        .build(connector))
}
