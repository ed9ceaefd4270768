use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::core::logging::LogFormat;

/// Credentials for one remote endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    pub token: String,
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
}

impl AuthConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            extra_headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RestMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl RestMethod {
    /// Read requests carry their payload in the query string.
    pub fn is_read(&self) -> bool {
        matches!(self, RestMethod::Get)
    }

    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            RestMethod::Get => reqwest::Method::GET,
            RestMethod::Post => reqwest::Method::POST,
            RestMethod::Put => reqwest::Method::PUT,
            RestMethod::Patch => reqwest::Method::PATCH,
            RestMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_batch_size")]
    pub size: usize,
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            size: default_batch_size(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_inter_batch_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    3
}

/// Per-invocation adapter configuration, owned by the caller.
///
/// `field_mappings` maps a target path to the source path it should be
/// read from, layered over the direction's default mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterConfig {
    #[serde(default)]
    pub source_endpoint: Option<String>,
    #[serde(default)]
    pub source_auth: Option<AuthConfig>,
    pub target_endpoint: String,
    #[serde(default)]
    pub target_auth: AuthConfig,
    #[serde(default)]
    pub rest_method: RestMethod,
    #[serde(default)]
    pub field_mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Attach stack traces to error reports
    #[serde(default)]
    pub debug: bool,
}

impl AdapterConfig {
    pub fn new(target_endpoint: impl Into<String>, target_auth: AuthConfig) -> Self {
        Self {
            source_endpoint: None,
            source_auth: None,
            target_endpoint: target_endpoint.into(),
            target_auth,
            rest_method: RestMethod::default(),
            field_mappings: BTreeMap::new(),
            batch: BatchConfig::default(),
            request_timeout_ms: default_request_timeout_ms(),
            max_attempts: default_max_attempts(),
            debug: false,
        }
    }

    pub fn with_source(mut self, endpoint: impl Into<String>, auth: AuthConfig) -> Self {
        self.source_endpoint = Some(endpoint.into());
        self.source_auth = Some(auth);
        self
    }

    pub fn with_rest_method(mut self, method: RestMethod) -> Self {
        self.rest_method = method;
        self
    }

    pub fn with_field_mapping(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.field_mappings.insert(target.into(), source.into());
        self
    }

    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch.inter_batch_delay_ms)
    }
}

/// Settings for the HTTP server binary. The engine itself never reads the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub client_origin: Option<String>,
}

impl ServerConfig {
    pub fn init() -> anyhow::Result<ServerConfig> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, defaults applied.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<ServerConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port = lookup("PORT")
            .unwrap_or_else(|| "8000".to_owned())
            .parse::<u16>()
            .context("PORT must be a number")?;
        let log_format = lookup("LOG_FORMAT")
            .unwrap_or_else(|| "compact".to_owned())
            .parse::<LogFormat>()
            .context("LOG_FORMAT must be one of compact, pretty, json")?;
        let client_origin = lookup("CLIENT_ORIGIN").filter(|origin| !origin.is_empty());

        Ok(ServerConfig {
            bind_address,
            port,
            log_format,
            client_origin,
        })
    }

    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_adapter_config_defaults_from_json() {
        let config: AdapterConfig = serde_json::from_value(json!({
            "targetEndpoint": "https://shop.example.test/admin/api/graphql.json",
            "targetAuth": {"token": "shpat_123"}
        }))
        .unwrap();

        assert_eq!(config.rest_method, RestMethod::Post);
        assert_eq!(config.batch, BatchConfig::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_attempts, 3);
        assert!(!config.debug);
        assert!(config.source_endpoint.is_none());
        assert!(config.target_auth.extra_headers.is_empty());
    }

    #[test]
    fn test_adapter_config_full_json() {
        let config: AdapterConfig = serde_json::from_value(json!({
            "sourceEndpoint": "https://shop.example.test/graphql",
            "sourceAuth": {"token": "src", "extraHeaders": {"X-Trace": "1"}},
            "targetEndpoint": "https://api.example.test/v1/products",
            "targetAuth": {"token": "sk_test"},
            "restMethod": "PATCH",
            "fieldMappings": {"name": "handle"},
            "batch": {"enabled": true, "size": 3, "interBatchDelayMs": 250},
            "debug": true
        }))
        .unwrap();

        assert_eq!(config.rest_method, RestMethod::Patch);
        assert_eq!(config.field_mappings.get("name").map(String::as_str), Some("handle"));
        assert_eq!(config.inter_batch_delay(), Duration::from_millis(250));
        assert_eq!(config.batch.size, 3);
        assert_eq!(
            config.source_auth.unwrap().extra_headers.get("X-Trace").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn test_rest_method_read_classification() {
        assert!(RestMethod::Get.is_read());
        assert!(!RestMethod::Delete.is_read());
        assert_eq!(RestMethod::Put.as_reqwest(), reqwest::Method::PUT);
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.socket_address(), "0.0.0.0:8000");
        assert_eq!(config.log_format, LogFormat::Compact);
        assert!(config.client_origin.is_none());
    }

    #[test]
    fn test_server_config_rejects_bad_port() {
        let env = HashMap::from([("PORT", "eighty")]);
        let result = ServerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_server_config_reads_values() {
        let env = HashMap::from([
            ("PORT", "9090"),
            ("LOG_FORMAT", "json"),
            ("CLIENT_ORIGIN", "http://localhost:3000"),
        ]);
        let config = ServerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.client_origin.as_deref(), Some("http://localhost:3000"));
    }
}
