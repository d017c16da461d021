use std::io::Error as IoError;

use http::header::InvalidHeaderName;
use http::header::InvalidHeaderValue;
use http::uri::InvalidUri;
use http::Error as HttpError;
use http::Method;
use http::StatusCode;
use hyper::Error as HyperError;
use thiserror::Error;

use os8_config::ConfigError;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

// For error mapping see: https://doc.rust-lang.org/nightly/core/convert/trait.From.html

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ClientError {
    /// the targeted singular resource does not exist
    #[error("resource not found: kind={kind} namespace={namespace:?} name={name:?}")]
    NotFound {
        kind: String,
        namespace: Option<String>,
        name: Option<String>,
    },
    /// non 2xx response from the api server, original status preserved
    #[error("api error: status={status} method={method} uri={uri} message={message}")]
    Api {
        status: StatusCode,
        method: Method,
        uri: String,
        message: String,
    },
    #[error("request timed out: method={method} uri={uri}")]
    Timeout { method: Method, uri: String },
    #[error("token fetch failed: {0}")]
    Token(String),
    #[error("{0}")]
    Hyper(#[from] HyperError),
    #[error("{0}")]
    Http(#[from] HttpError),
    #[error("invalid uri: {0}")]
    InvalidUri(#[from] InvalidUri),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] InvalidHeaderName),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("query error: {0}")]
    Query(#[from] serde_qs::Error),
    #[error("{0}")]
    Io(#[from] IoError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("tls error: {0}")]
    Tls(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// 5xx response, transient by default
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if status.is_server_error())
    }

    /// 4xx response, never transient
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if status.is_client_error())
    }

    /// failure below the http layer (reset, timeout, premature close)
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Hyper(_) | Self::Timeout { .. } | Self::Io(_))
    }

    pub(crate) fn not_found<R>(resource: &R) -> Self
    where
        R: os8_types::HasIdentity + ?Sized,
    {
        Self::NotFound {
            kind: resource.kind().to_owned(),
            namespace: resource.namespace().map(str::to_owned),
            name: resource.name().map(str::to_owned),
        }
    }
}
