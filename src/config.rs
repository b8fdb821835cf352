//! File-level configuration for [`crate::client::NetworkKitBuilder::with_config`].
//!
//! ```yaml
//! circuit_breaker:
//!   failure_threshold: 5
//!   open_timeout_ms: 10000
//!   half_open_max_requests: 2
//! transport:
//!   timeout_secs: 20
//! ```

use crate::resilience::circuit_breaker::CircuitBreakerConfig;
use crate::transport::http::HttpTransportConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetKitConfig {
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    pub transport: Option<HttpTransportConfig>,
}

impl NetKitConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::decoding_failed("NetKitConfig", e))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::decoding_failed("NetKitConfig", e))
    }

    /// Loads a `.json` file as JSON and anything else as YAML.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(Error::unknown)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_yaml_config() {
        let config = NetKitConfig::from_yaml_str(
            "circuit_breaker:\n  failure_threshold: 5\n  open_timeout_ms: 10000\ntransport:\n  timeout_secs: 20\n",
        )
        .unwrap();
        let breaker = config.circuit_breaker.unwrap();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.open_timeout, Duration::from_secs(10));
        assert_eq!(breaker.half_open_max_requests, 3);
        let transport = config.transport.unwrap();
        assert_eq!(transport.timeout_secs, 20);
        assert_eq!(transport.pool_max_idle_per_host, 32);
    }

    #[test]
    fn test_json_config_and_empty_sections() {
        let config = NetKitConfig::from_json_str("{}").unwrap();
        assert_eq!(config, NetKitConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        let err = NetKitConfig::from_yaml_str("circuit_breaker: [1, 2]").unwrap_err();
        assert!(matches!(err, Error::DecodingFailed { ref target_type, .. } if target_type == "NetKitConfig"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = NetKitConfig::load("/definitely/not/here.yaml").await.unwrap_err();
        assert!(matches!(err, Error::Unknown { cause: Some(_) }));
    }
}
