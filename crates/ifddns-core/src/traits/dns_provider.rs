// # DNS Provider Trait
//
// Defines the gateway to a remote DNS provider: three logical operations
// addressed by a provider-assigned record identifier.
//
// ## Implementations
//
// - Alibaba Cloud DNS: `ifddns-provider-aliyun` crate
//
// ## Usage
//
// ```rust,ignore
// use ifddns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let record_id = provider.resolve("example.com", "home").await?;
//     provider
//         .update(&record_id, "A", "home", std::net::Ipv4Addr::new(203, 0, 113, 5))
//         .await?;
//     assert_eq!(provider.read(&record_id).await?, "203.0.113.5");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for DNS provider implementations
///
/// Implementations own their credentials and nothing else. They are the only
/// place where provider-specific failures (HTTP status codes, error payloads)
/// are translated into [`crate::Error`].
///
/// # Error contract
///
/// | Operation | Failure variant |
/// |-----------|-----------------|
/// | `resolve` | [`crate::Error::Resolution`] |
/// | `update`  | [`crate::Error::Update`] |
/// | `read`    | [`crate::Error::Read`] |
///
/// # Forbidden Capabilities
/// - ❌ Retry or back off (registration retry is owned by the `Reconciler`)
/// - ❌ Cache record values between calls
/// - ❌ Decide whether an update is needed
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Find the record matching `record_prefix` under `domain_name`
    ///
    /// Returns the identifier of the first matching record. No match, a failed
    /// query and an unparsable response are all `Error::Resolution`.
    async fn resolve(&self, domain_name: &str, record_prefix: &str) -> crate::Result<String>;

    /// Point the record at `value`
    ///
    /// A rejection reported inside an otherwise successful response body is a
    /// failure too. Writing the value already in place may be rejected by the
    /// provider; callers must tolerate that.
    async fn update(
        &self,
        record_id: &str,
        record_type: &str,
        record_prefix: &str,
        value: Ipv4Addr,
    ) -> crate::Result<()>;

    /// Read the record's current value back from the provider
    async fn read(&self, record_id: &str) -> crate::Result<String>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// Construction failures (bad credentials, HTTP client setup) are
    /// `Error::Config` and stop startup.
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> crate::Result<Box<dyn DnsProvider>>;
}
