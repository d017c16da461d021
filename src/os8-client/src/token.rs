//! Bearer token sources.
//!
//! A fetcher returning `None` is a valid anonymous state, the request goes
//! out without an `Authorization` header and any rejection surfaces later
//! as a 401/403 from the server.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{ClientError, Result};

#[async_trait]
pub trait TokenFetcher: Send + Sync {
    /// supply a bearer token, optionally scoped to an audience
    async fn token(&self, audience: Option<&str>) -> Result<Option<String>>;
}

/// fixed token, mainly useful for tests and user supplied sessions
#[derive(Debug, Clone)]
pub struct StaticTokenFetcher {
    token: String,
}

impl StaticTokenFetcher {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenFetcher for StaticTokenFetcher {
    async fn token(&self, _audience: Option<&str>) -> Result<Option<String>> {
        Ok(Some(self.token.clone()))
    }
}

/// reads the mounted service account token on every call so rotated tokens
/// are picked up without restarting
#[derive(Debug, Clone)]
pub struct FileTokenFetcher {
    path: PathBuf,
}

impl FileTokenFetcher {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenFetcher for FileTokenFetcher {
    async fn token(&self, _audience: Option<&str>) -> Result<Option<String>> {
        let raw = fs::read_to_string(&self.path).await?;
        Ok(Some(raw.trim().to_owned()))
    }
}

/// projected service account tokens, one file per audience under the mount
/// directory. Tokens are cached by audience after the first read.
#[derive(Debug)]
pub struct PsatTokenFetcher {
    mount: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl PsatTokenFetcher {
    pub fn new<P: Into<PathBuf>>(mount: P) -> Self {
        Self {
            mount: mount.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TokenFetcher for PsatTokenFetcher {
    async fn token(&self, audience: Option<&str>) -> Result<Option<String>> {
        let audience = audience
            .ok_or_else(|| ClientError::Token("psat token requires an audience".to_owned()))?;

        if let Some(token) = self.cache.read().await.get(audience) {
            return Ok(Some(token.clone()));
        }

        let path = self.mount.join(audience);
        debug!(path = %path.display(), audience, "reading projected token");
        let token = fs::read_to_string(&path).await?.trim().to_owned();
        self.cache
            .write()
            .await
            .insert(audience.to_owned(), token.clone());
        Ok(Some(token))
    }
}

/// anonymous requests
#[derive(Debug, Clone, Default)]
pub struct NoopTokenFetcher;

#[async_trait]
impl TokenFetcher for NoopTokenFetcher {
    async fn token(&self, _audience: Option<&str>) -> Result<Option<String>> {
        debug!("noop token fetcher configured, no token sent");
        Ok(None)
    }
}
