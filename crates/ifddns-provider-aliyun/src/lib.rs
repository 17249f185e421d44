// # Alibaba Cloud DNS Provider
//
// This crate provides the Alidns gateway for ifddns. It exposes the three
// logical operations the reconciler consumes:
//
// - `resolve`: DescribeDomainRecords (DomainName + RRKeyWord) → RecordId
// - `update`:  UpdateDomainRecord (RecordId, RR, Type, Value)
// - `read`:    DescribeDomainRecordInfo (RecordId) → Value
//
// Requests use the RPC style (parameters in the query string, empty body)
// signed with ACS3-HMAC-SHA256. Each operation makes exactly one HTTP
// request; retries and scheduling are owned by the reconciler.
//
// ## Error mapping
//
// Every failure, whether transport-level, an HTTP error status, or a
// `Code`/`Message` pair in an otherwise successful response body, is
// translated into the operation's own error kind: `Error::Resolution`,
// `Error::Update` or `Error::Read`. This is the only place Alidns error
// shapes are seen.
//
// ## Security Requirements
//
// - The access key secret NEVER appears in logs or `Debug` output
// - Provider creation fails fast if any credential field is empty
//
// ## API Reference
//
// - Alidns API 2015-01-09: https://api.aliyun.com/document/Alidns/2015-01-09/overview

mod sign;
mod types;

use async_trait::async_trait;
use ifddns_core::config::{Credentials, ProviderConfig};
use ifddns_core::traits::{DnsProvider, DnsProviderFactory};
use ifddns_core::{Error, ProviderRegistry, Result};
use serde::de::DeserializeOwned;
use std::net::Ipv4Addr;
use std::time::Duration;

use sign::SigningInput;
pub use types::{canonical_query_string, url_encode};
use types::{ApiErrorBody, DescribeDomainRecordInfoResponse, DescribeDomainRecordsResponse};

/// Alidns API version
pub(crate) const ALIDNS_VERSION: &str = "2015-01-09";

/// SHA-256 of the empty request body
pub(crate) const EMPTY_BODY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure of a single Alidns call, before it is mapped to an operation
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{code}: {message}")]
    Api { code: String, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Failed to sign request: {0}")]
    Signing(String),
}

/// Turn a raw response into its JSON body, surfacing API errors
///
/// Alidns reports some failures with HTTP 200 and a `Code` field, so the
/// body is checked even when the status is a success.
fn check_response(status: u16, body: &str) -> std::result::Result<serde_json::Value, ApiError> {
    if status >= 400 {
        return Err(match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(err) => ApiError::Api {
                code: err.code,
                message: err.message,
            },
            Err(_) => ApiError::Status {
                status,
                body: body.to_string(),
            },
        });
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ApiError::Parse(e.to_string()))?;

    if let (Some(code), Some(message)) = (
        value.get("Code").and_then(|v| v.as_str()),
        value.get("Message").and_then(|v| v.as_str()),
    ) {
        return Err(ApiError::Api {
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    Ok(value)
}

/// Alibaba Cloud DNS provider
///
/// Stateless apart from its credentials and HTTP client.
pub struct AliyunProvider {
    /// Key id, key secret and endpoint
    /// ⚠️ NEVER log the secret
    credentials: Credentials,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the access key secret
impl std::fmt::Debug for AliyunProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliyunProvider")
            .field("access_key_id", &self.credentials.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field("endpoint", &self.credentials.endpoint)
            .finish()
    }
}

impl AliyunProvider {
    /// Create a new provider
    ///
    /// # Errors
    ///
    /// `Error::Config` if a credential field is empty or the HTTP client
    /// cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self> {
        credentials.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            credentials,
            client,
        })
    }

    /// The API endpoint host
    pub fn endpoint(&self) -> &str {
        &self.credentials.endpoint
    }

    /// Execute one signed RPC call and decode its body
    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> std::result::Result<T, ApiError> {
        let query_string = canonical_query_string(params);
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = uuid::Uuid::new_v4().to_string();
        let host = self.credentials.endpoint.as_str();

        let authorization = sign::authorization(
            &self.credentials.access_key_id,
            &self.credentials.access_key_secret,
            &SigningInput {
                host,
                action,
                query_string: &query_string,
                timestamp: &timestamp,
                nonce: &nonce,
            },
        )?;

        let url = if query_string.is_empty() {
            format!("https://{host}/")
        } else {
            format!("https://{host}/?{query_string}")
        };

        tracing::debug!("Calling Alidns {} on {}", action, host);

        let response = self
            .client
            .post(&url)
            .header("host", host)
            .header("x-acs-action", action)
            .header("x-acs-version", ALIDNS_VERSION)
            .header("x-acs-date", &timestamp)
            .header("x-acs-signature-nonce", &nonce)
            .header("x-acs-content-sha256", EMPTY_BODY_SHA256)
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let value = check_response(status, &body)?;
        serde_json::from_value(value).map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl DnsProvider for AliyunProvider {
    async fn resolve(&self, domain_name: &str, record_prefix: &str) -> Result<String> {
        let response: DescribeDomainRecordsResponse = self
            .call(
                "DescribeDomainRecords",
                &[("DomainName", domain_name), ("RRKeyWord", record_prefix)],
            )
            .await
            .map_err(|e| {
                Error::resolution(format!(
                    "DescribeDomainRecords {record_prefix}.{domain_name}: {e}"
                ))
            })?;

        let record_id = response.record_id_for(record_prefix).ok_or_else(|| {
            Error::resolution(format!(
                "No record {record_prefix} found under {domain_name}"
            ))
        })?;

        tracing::debug!(
            "Resolved {}.{} to recordId {}",
            record_prefix,
            domain_name,
            record_id
        );
        Ok(record_id.to_string())
    }

    async fn update(
        &self,
        record_id: &str,
        record_type: &str,
        record_prefix: &str,
        value: Ipv4Addr,
    ) -> Result<()> {
        let value = value.to_string();
        self.call::<serde_json::Value>(
            "UpdateDomainRecord",
            &[
                ("RecordId", record_id),
                ("RR", record_prefix),
                ("Type", record_type),
                ("Value", value.as_str()),
            ],
        )
        .await
        .map_err(|e| Error::update(e.to_string()))?;

        Ok(())
    }

    async fn read(&self, record_id: &str) -> Result<String> {
        let response: DescribeDomainRecordInfoResponse = self
            .call("DescribeDomainRecordInfo", &[("RecordId", record_id)])
            .await
            .map_err(|e| Error::read(e.to_string()))?;

        Ok(response.value)
    }

    fn provider_name(&self) -> &'static str {
        "aliyun"
    }
}

/// Factory for creating Alibaba Cloud providers
pub struct AliyunFactory;

impl DnsProviderFactory for AliyunFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let ProviderConfig::Aliyun { credentials } = config;
        Ok(Box::new(AliyunProvider::new(credentials.clone())?))
    }
}

/// Register the Aliyun provider with a registry
///
/// # Example
///
/// ```rust
/// use ifddns_core::ProviderRegistry;
///
/// let mut registry = ProviderRegistry::new();
/// ifddns_provider_aliyun::register(&mut registry);
/// assert!(registry.has_provider("aliyun"));
/// ```
pub fn register(registry: &mut ProviderRegistry) {
    registry.register_provider("aliyun", Box::new(AliyunFactory));
}
