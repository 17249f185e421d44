//! Configuration types for the DDNS system
//!
//! This module defines all configuration structures used throughout the crate.
//! Binding entries accept the legacy `domain.json` key names (`Name`, `Type`,
//! `RR`, `NetCard`) as well as snake_case names.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Alibaba Cloud DNS endpoint
pub const DEFAULT_ALIYUN_ENDPOINT: &str = "alidns.cn-hangzhou.aliyuncs.com";

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Domain bindings to keep converged
    pub bindings: Vec<BindingConfig>,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a new configuration with defaults
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            bindings: Vec::new(),
            engine: EngineConfig::default(),
        }
    }

    /// Append a binding
    pub fn with_binding(mut self, binding: BindingConfig) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.bindings.is_empty() {
            return Err(crate::Error::config("No bindings configured"));
        }

        self.provider.validate()?;
        for binding in &self.bindings {
            binding.validate()?;
        }
        self.engine.validate()?;

        Ok(())
    }
}

/// Provider identity: key id, key secret and API endpoint
///
/// The secret never appears in `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Access key id
    pub access_key_id: String,

    /// Access key secret
    /// ⚠️ NEVER log this value
    pub access_key_secret: String,

    /// API endpoint host (e.g. "alidns.cn-hangzhou.aliyuncs.com")
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Credentials {
    /// Create credentials for the default endpoint
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            endpoint: default_endpoint(),
        }
    }

    /// Override the endpoint host
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Validate that every field is present
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.access_key_id.is_empty() {
            return Err(crate::Error::config("Access key id cannot be empty"));
        }
        if self.access_key_secret.is_empty() {
            return Err(crate::Error::config("Access key secret cannot be empty"));
        }
        if self.endpoint.is_empty() {
            return Err(crate::Error::config("Endpoint cannot be empty"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

fn default_endpoint() -> String {
    DEFAULT_ALIYUN_ENDPOINT.to_string()
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Alibaba Cloud DNS provider
    Aliyun {
        /// Access key and endpoint
        #[serde(flatten)]
        credentials: Credentials,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Aliyun { credentials } => credentials.validate(),
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Aliyun { .. } => "aliyun",
        }
    }
}

/// One domain-to-interface binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Registered domain (e.g., "example.com")
    #[serde(rename = "Name", alias = "domain_name", default)]
    pub domain_name: String,

    /// Record type, "A" for IPv4
    #[serde(rename = "Type", alias = "record_type", default = "default_record_type")]
    pub record_type: String,

    /// Subdomain label (e.g., "home" for "home.example.com")
    #[serde(rename = "RR", alias = "record_prefix", default)]
    pub record_prefix: String,

    /// Local interface to monitor (e.g., "eth0")
    #[serde(rename = "NetCard", alias = "interface_name", default)]
    pub interface_name: String,
}

impl BindingConfig {
    /// Create a new A-record binding
    pub fn new(
        domain_name: impl Into<String>,
        record_prefix: impl Into<String>,
        interface_name: impl Into<String>,
    ) -> Self {
        Self {
            domain_name: domain_name.into(),
            record_type: default_record_type(),
            record_prefix: record_prefix.into(),
            interface_name: interface_name.into(),
        }
    }

    /// Set the record type
    pub fn with_record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = record_type.into();
        self
    }

    /// Fully qualified record name, for logging
    pub fn fqdn(&self) -> String {
        if self.record_prefix == "@" {
            self.domain_name.clone()
        } else {
            format!("{}.{}", self.record_prefix, self.domain_name)
        }
    }

    /// Every field must be filled in
    pub fn validate(&self) -> Result<(), crate::Error> {
        let missing = [
            ("domain name", &self.domain_name),
            ("record type", &self.record_type),
            ("record prefix", &self.record_prefix),
            ("interface name", &self.interface_name),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());

        match missing {
            Some((field, _)) => Err(crate::Error::config(format!(
                "Binding {:?} is incomplete: {} is empty",
                self.fqdn(),
                field
            ))),
            None => Ok(()),
        }
    }
}

fn default_record_type() -> String {
    "A".to_string()
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interval between reconciliation ticks (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Delay before retrying a failed registration (in seconds)
    #[serde(default = "default_registration_retry_secs")]
    pub registration_retry_secs: u64,

    /// Capacity of the outcome event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Tick interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Registration retry delay as a `Duration`
    pub fn registration_retry_delay(&self) -> Duration {
        Duration::from_secs(self.registration_retry_secs)
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.registration_retry_secs == 0 {
            return Err(crate::Error::config("Registration retry delay must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            registration_retry_secs: default_registration_retry_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_registration_retry_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliyun() -> ProviderConfig {
        ProviderConfig::Aliyun {
            credentials: Credentials::new("LTAI-test", "secret-value"),
        }
    }

    #[test]
    fn legacy_domain_file_format_parses() {
        let json = r#"[
            {"Name": "example.com", "Type": "A", "RR": "home", "NetCard": "eth0"},
            {"Name": "example.org", "RR": "nas", "NetCard": "wlan0"}
        ]"#;

        let bindings: Vec<BindingConfig> = serde_json::from_str(json).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0], BindingConfig::new("example.com", "home", "eth0"));
        assert_eq!(bindings[1].record_type, "A");
        assert_eq!(bindings[1].interface_name, "wlan0");
    }

    #[test]
    fn snake_case_aliases_parse() {
        let json = r#"{"domain_name": "example.com", "record_prefix": "home", "interface_name": "eth0"}"#;
        let binding: BindingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(binding, BindingConfig::new("example.com", "home", "eth0"));
    }

    #[test]
    fn missing_binding_field_is_config_error() {
        let json = r#"{"Name": "example.com", "Type": "A", "NetCard": "eth0"}"#;
        let binding: BindingConfig = serde_json::from_str(json).unwrap();

        let err = binding.validate().unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
        assert!(err.to_string().contains("record prefix"));
    }

    #[test]
    fn empty_bindings_rejected() {
        let config = DdnsConfig::new(aliyun());
        assert!(config.validate().is_err());
    }

    #[test]
    fn complete_config_validates() {
        let config = DdnsConfig::new(aliyun())
            .with_binding(BindingConfig::new("example.com", "home", "eth0"));
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.engine.registration_retry_delay(), Duration::from_secs(10));
    }

    #[test]
    fn empty_secret_rejected() {
        let config = DdnsConfig::new(ProviderConfig::Aliyun {
            credentials: Credentials::new("LTAI-test", ""),
        })
        .with_binding(BindingConfig::new("example.com", "home", "eth0"));

        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn provider_config_is_tagged() {
        let json = r#"{"type": "aliyun", "access_key_id": "id", "access_key_secret": "s"}"#;
        let config: ProviderConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.type_name(), "aliyun");
        let ProviderConfig::Aliyun { credentials } = config;
        assert_eq!(credentials.endpoint, DEFAULT_ALIYUN_ENDPOINT);
    }

    #[test]
    fn secret_not_exposed_in_debug() {
        let debug_str = format!("{:?}", Credentials::new("LTAI-test", "super_secret_123"));
        assert!(!debug_str.contains("super_secret_123"));
        assert!(debug_str.contains("LTAI-test"));
    }

    #[test]
    fn fqdn_handles_apex() {
        assert_eq!(BindingConfig::new("example.com", "home", "eth0").fqdn(), "home.example.com");
        assert_eq!(BindingConfig::new("example.com", "@", "eth0").fqdn(), "example.com");
    }
}
