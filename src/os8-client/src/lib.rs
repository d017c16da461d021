//! Typed REST client for the Kubernetes/OpenShift api server.
//!
//! Given any resource type carrying the [`HasIdentity`](os8_types::HasIdentity)
//! capability, the client computes the REST url, attaches bearer auth,
//! executes the call with bounded exponential backoff retry and decodes the
//! response into the caller's type.

mod blocking;
mod client;
mod error;
mod exec;
mod token;
mod watch;

pub mod uri;

pub use self::blocking::BlockingClient;
pub use self::client::CallParams;
pub use self::client::K8Client;
pub use self::client::K8ClientBuilder;
pub use self::client::SharedK8Client;
pub use self::error::ClientError;
pub use self::error::Result;
pub use self::token::FileTokenFetcher;
pub use self::token::NoopTokenFetcher;
pub use self::token::PsatTokenFetcher;
pub use self::token::StaticTokenFetcher;
pub use self::token::TokenFetcher;
pub use self::watch::LineStream;
pub use self::watch::WatchFlow;
pub use os8_config::ClientConfig;
pub use os8_config::HttpTimeoutConfiguration;
pub use os8_config::RetryConfiguration;

pub mod types {
    pub use os8_types::*;
}
