//! Executor configuration

use remotecommand_proto::ProtocolVersion;
use serde::{Deserialize, Serialize};

/// Default chunk size for the stdin/stdout/stderr copies
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Method of the upgrade request
    pub method: String,
    /// Target of the upgrade request
    pub url: String,
    /// Protocol identifiers offered during negotiation, most capable first
    pub protocols: Vec<String>,
    pub copy_buffer_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            method: "POST".to_string(),
            url: String::new(),
            protocols: ProtocolVersion::default_identifiers(),
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }
}

impl ExecutorConfig {
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("url is required".to_string());
        }
        self.url
            .parse::<http::Uri>()
            .map_err(|e| format!("invalid url {:?}: {}", self.url, e))?;
        http::Method::from_bytes(self.method.as_bytes())
            .map_err(|e| format!("invalid method {:?}: {}", self.method, e))?;

        if self.protocols.is_empty() {
            return Err("at least one protocol must be offered".to_string());
        }
        for protocol in &self.protocols {
            protocol
                .parse::<ProtocolVersion>()
                .map_err(|e| e.to_string())?;
        }

        if self.copy_buffer_size == 0 {
            return Err("copy_buffer_size must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Builder for ExecutorConfig
#[derive(Default)]
pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.config.method = method.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Restrict negotiation to these versions, in the given order
    pub fn protocols(mut self, versions: impl IntoIterator<Item = ProtocolVersion>) -> Self {
        self.config.protocols = versions
            .into_iter()
            .map(|v| v.identifier().to_string())
            .collect();
        self
    }

    pub fn copy_buffer_size(mut self, size: usize) -> Self {
        self.config.copy_buffer_size = size;
        self
    }

    pub fn build(self) -> Result<ExecutorConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ExecutorConfig::builder()
            .url("https://cluster.example.com/api/v1/namespaces/default/pods/web/exec")
            .protocols([ProtocolVersion::V3, ProtocolVersion::V2])
            .build()
            .unwrap();

        assert_eq!(config.method, "POST");
        assert_eq!(
            config.protocols,
            vec!["v3.channel.k8s.io", "v2.channel.k8s.io"]
        );
        assert_eq!(config.copy_buffer_size, DEFAULT_COPY_BUFFER_SIZE);
    }

    #[test]
    fn test_config_builder_missing_url() {
        assert!(ExecutorConfig::builder().build().is_err());
    }

    #[test]
    fn test_config_rejects_invalid_values() {
        let base = ExecutorConfig {
            url: "https://example.com/exec".to_string(),
            ..Default::default()
        };
        assert!(base.validate().is_ok());

        let config = ExecutorConfig {
            protocols: Vec::new(),
            ..base.clone()
        };
        assert!(config.validate().is_err());

        let config = ExecutorConfig {
            protocols: vec!["v9.channel.k8s.io".to_string()],
            ..base.clone()
        };
        assert!(config.validate().unwrap_err().contains("v9.channel.k8s.io"));

        let config = ExecutorConfig {
            copy_buffer_size: 0,
            ..base.clone()
        };
        assert!(config.validate().is_err());

        let config = ExecutorConfig {
            method: "BAD METHOD".to_string(),
            ..base
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: ExecutorConfig =
            serde_json::from_str(r#"{"url": "https://example.com/attach", "method": "GET"}"#)
                .unwrap();

        assert_eq!(config.method, "GET");
        assert_eq!(config.protocols, ProtocolVersion::default_identifiers());
        assert!(config.validate().is_ok());
    }
}
