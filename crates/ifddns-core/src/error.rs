//! Error types for the DDNS system
//!
//! The first five variants form the reconciliation taxonomy. Gateway
//! implementations translate provider-specific failures into them; nothing
//! above the gateway inspects provider error shapes.

use std::net::Ipv4Addr;
use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid credentials or binding fields (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider could not locate a record for a binding
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// The provider rejected or failed an update attempt
    #[error("Update error: {0}")]
    Update(String),

    /// Read-back of a record failed (inconclusive)
    #[error("Read error: {0}")]
    Read(String),

    /// Read-back value disagrees with the value just written
    #[error("Verification mismatch: expected {expected}, provider has {actual}")]
    VerificationMismatch {
        /// Value the update should have installed
        expected: Ipv4Addr,
        /// Value the provider reported
        actual: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create an update error
    pub fn update(msg: impl Into<String>) -> Self {
        Self::Update(msg.into())
    }

    /// Create a read-back error
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    /// Whether this error is fatal to process startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
