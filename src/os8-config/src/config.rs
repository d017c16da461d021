use std::fs;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::ConfigError;

pub const DEFAULT_CLUSTER_URL: &str = "https://kubernetes.default.svc.cluster.local";
pub const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const SERVICE_ACCOUNT_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// client configuration, deserializable from whatever config layer the
/// embedding application uses. Durations are given in milliseconds.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub url: String,
    pub token_location: String,
    pub ca_location: Option<String>,
    pub retry: RetryConfiguration,
    pub timeout: HttpTimeoutConfiguration,
    pub max_connections: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CLUSTER_URL.to_owned(),
            token_location: SERVICE_ACCOUNT_TOKEN_PATH.to_owned(),
            ca_location: Some(SERVICE_ACCOUNT_CA_PATH.to_owned()),
            retry: RetryConfiguration::default(),
            timeout: HttpTimeoutConfiguration::default(),
            max_connections: 16,
        }
    }
}

impl ClientConfig {
    /// in-cluster defaults pointing at the internal api server address
    pub fn in_cluster() -> Self {
        Self::default()
    }

    pub fn with_url<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// read the mounted service account token
    pub fn read_token(&self) -> Result<String, ConfigError> {
        debug!(path = %self.token_location, "reading service account token");
        let raw = fs::read_to_string(&self.token_location)?;
        let token = raw.trim();
        if token.is_empty() {
            return Err(ConfigError::NoToken(self.token_location.clone()));
        }
        Ok(token.to_owned())
    }
}

/// bounded exponential backoff retry. `times = 0` disables retry entirely.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfiguration {
    pub times: u32,
    #[serde(with = "duration_millis")]
    pub min: Duration,
    #[serde(with = "duration_millis")]
    pub max: Duration,
}

impl Default for RetryConfiguration {
    fn default() -> Self {
        Self {
            times: 3,
            min: Duration::from_millis(100),
            max: Duration::from_secs(1),
        }
    }
}

impl RetryConfiguration {
    pub fn none() -> Self {
        Self {
            times: 0,
            ..Default::default()
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpTimeoutConfiguration {
    #[serde(with = "duration_millis")]
    pub connect: Duration,
    #[serde(with = "duration_millis")]
    pub read: Duration,
    #[serde(with = "duration_millis")]
    pub write: Duration,
}

impl Default for HttpTimeoutConfiguration {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(2),
            read: Duration::from_secs(5),
            write: Duration::from_secs(5),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod test {

    use std::time::Duration;

    use super::ClientConfig;
    use super::RetryConfiguration;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.url, super::DEFAULT_CLUSTER_URL);
        assert_eq!(config.retry.times, 3);
        assert_eq!(config.retry.min, Duration::from_millis(100));
        assert_eq!(config.retry.max, Duration::from_secs(1));
        assert_eq!(config.timeout.connect, Duration::from_secs(2));
        assert_eq!(config.max_connections, 16);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ClientConfig = serde_json::from_str(
            r#"{
                "url": "https://api.test:8443",
                "retry": { "times": 1, "min": 10, "max": 50 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.url, "https://api.test:8443");
        assert_eq!(
            config.retry,
            RetryConfiguration {
                times: 1,
                min: Duration::from_millis(10),
                max: Duration::from_millis(50),
            }
        );
        // untouched sections keep their defaults
        assert_eq!(config.timeout.read, Duration::from_secs(5));
    }

    #[test]
    fn test_no_retry() {
        assert_eq!(RetryConfiguration::none().times, 0);
    }
}
