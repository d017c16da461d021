//! Blocking adapter over the async client.
//!
//! Same executor and retry logic underneath, only the calling convention
//! differs. Must not be used from inside an async context.

use tokio::runtime::Builder;
use tokio::runtime::Runtime;

use serde::de::DeserializeOwned;
use serde::Serialize;

use os8_types::options::DeleteOptions;
use os8_types::DeploymentConfig;
use os8_types::HasIdentity;
use os8_types::Scale;
use os8_types::Status;
use os8_types::User;
use os8_types::WatchEvent;

use crate::client::CallParams;
use crate::client::K8Client;
use crate::watch::WatchFlow;
use crate::Result;

pub struct BlockingClient {
    inner: K8Client,
    runtime: Runtime,
}

impl BlockingClient {
    pub fn new(inner: K8Client) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    pub fn get<K, R>(&self, resource: &R, params: &CallParams<'_>) -> Result<K>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
    {
        self.runtime.block_on(self.inner.get(resource, params))
    }

    pub fn get_or_null<K, R>(&self, resource: &R, params: &CallParams<'_>) -> Result<Option<K>>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
    {
        self.runtime
            .block_on(self.inner.get_or_null(resource, params))
    }

    pub fn get_many<K, R>(&self, resource: &R, params: &CallParams<'_>) -> Result<Vec<K>>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
    {
        self.runtime.block_on(self.inner.get_many(resource, params))
    }

    pub fn post<K>(&self, resource: &K, params: &CallParams<'_>) -> Result<K>
    where
        K: HasIdentity + Serialize + DeserializeOwned,
    {
        self.runtime.block_on(self.inner.post(resource, params))
    }

    pub fn put<K>(&self, resource: &K, params: &CallParams<'_>) -> Result<K>
    where
        K: HasIdentity + Serialize + DeserializeOwned,
    {
        self.runtime.block_on(self.inner.put(resource, params))
    }

    pub fn delete_foreground<K, R>(
        &self,
        resource: &R,
        options: Option<DeleteOptions>,
        params: &CallParams<'_>,
    ) -> Result<K>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
    {
        self.runtime
            .block_on(self.inner.delete_foreground(resource, options, params))
    }

    pub fn delete_orphan<K, R>(
        &self,
        resource: &R,
        options: Option<DeleteOptions>,
        params: &CallParams<'_>,
    ) -> Result<K>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
    {
        self.runtime
            .block_on(self.inner.delete_orphan(resource, options, params))
    }

    pub fn delete_background<R>(
        &self,
        resource: &R,
        options: Option<DeleteOptions>,
        params: &CallParams<'_>,
    ) -> Result<Status>
    where
        R: HasIdentity + ?Sized,
    {
        self.runtime
            .block_on(self.inner.delete_background(resource, options, params))
    }

    pub fn scale_deployment_config(
        &self,
        namespace: &str,
        name: &str,
        count: i32,
        params: &CallParams<'_>,
    ) -> Result<Scale> {
        self.runtime.block_on(
            self.inner
                .scale_deployment_config(namespace, name, count, params),
        )
    }

    pub fn rollout_deployment_config(
        &self,
        namespace: &str,
        name: &str,
        params: &CallParams<'_>,
    ) -> Result<DeploymentConfig> {
        self.runtime
            .block_on(self.inner.rollout_deployment_config(namespace, name, params))
    }

    pub fn proxy_get<T, R>(
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
        self.runtime
            .block_on(self.inner.proxy_get(pod, port, path, headers, params))
    }

    pub fn proxy_post<T, R, B>(
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
        self.runtime
            .block_on(self.inner.proxy_post(pod, port, path, headers, body, params))
    }

    pub fn proxy_delete<T, R>(
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
        self.runtime
            .block_on(self.inner.proxy_delete(pod, port, path, headers, params))
    }

    pub fn current_user(&self, token: &str) -> Result<Option<User>> {
        self.runtime.block_on(self.inner.current_user(token))
    }

    /// reconnecting watch loop, runs until the handler asks to stop
    pub fn watch_forever<K, R, F>(
        &self,
        resource: &R,
        types: &[&str],
        params: &CallParams<'_>,
        handler: F,
    ) -> Result<()>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
        F: FnMut(WatchEvent<K>) -> WatchFlow,
    {
        self.runtime
            .block_on(self.inner.watch_forever(resource, types, params, handler))
    }
}
