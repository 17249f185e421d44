//! ACS3-HMAC-SHA256 request signing
//!
//! Reference: <https://www.alibabacloud.com/help/en/sdk/product-overview/v3-request-structure-and-signature>

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::{ALIDNS_VERSION, ApiError, EMPTY_BODY_SHA256};

type HmacSha256 = Hmac<Sha256>;

const SIGNED_HEADERS: &str =
    "host;x-acs-action;x-acs-content-sha256;x-acs-date;x-acs-signature-nonce;x-acs-version";

/// Inputs of one signed RPC call
pub(crate) struct SigningInput<'a> {
    pub host: &'a str,
    pub action: &'a str,
    pub query_string: &'a str,
    pub timestamp: &'a str,
    pub nonce: &'a str,
}

/// Build the `Authorization` header value for a POST with an empty body
pub(crate) fn authorization(
    access_key_id: &str,
    access_key_secret: &str,
    input: &SigningInput<'_>,
) -> Result<String, ApiError> {
    let canonical_headers = format!(
        "host:{}\nx-acs-action:{}\nx-acs-content-sha256:{EMPTY_BODY_SHA256}\nx-acs-date:{}\nx-acs-signature-nonce:{}\nx-acs-version:{ALIDNS_VERSION}\n",
        input.host, input.action, input.timestamp, input.nonce
    );

    let canonical_request = format!(
        "POST\n/\n{}\n{canonical_headers}\n{SIGNED_HEADERS}\n{EMPTY_BODY_SHA256}",
        input.query_string
    );
    tracing::trace!("Canonical request:\n{}", canonical_request);

    let hashed_request = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let string_to_sign = format!("ACS3-HMAC-SHA256\n{hashed_request}");

    let mut mac = HmacSha256::new_from_slice(access_key_secret.as_bytes())
        .map_err(|e| ApiError::Signing(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(format!(
        "ACS3-HMAC-SHA256 Credential={access_key_id},SignedHeaders={SIGNED_HEADERS},Signature={signature}"
    ))
}
