//! Alidns request encoding and response types

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// RFC3986 percent-encoding, as required by the ACS3 canonical request
pub fn url_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                let _ = write!(result, "%{byte:02X}");
            }
        }
    }
    result
}

/// Build the canonical query string: keys sorted, keys and values encoded
pub fn canonical_query_string(params: &[(&str, &str)]) -> String {
    let sorted: BTreeMap<&str, &str> = params.iter().copied().collect();
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", url_encode(k), url_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// One record as returned by DescribeDomainRecords
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    pub record_id: String,
    #[serde(rename = "RR", default)]
    pub rr: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainRecords {
    #[serde(default)]
    pub record: Vec<Record>,
}

/// DescribeDomainRecords response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeDomainRecordsResponse {
    pub domain_records: Option<DomainRecords>,
}

/// DescribeDomainRecordInfo response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeDomainRecordInfoResponse {
    pub value: String,
}

/// Error payload carried by a failed response (`Code` and `Message`)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl DescribeDomainRecordsResponse {
    /// Pick the record id for `record_prefix`
    ///
    /// `RRKeyWord` is a fuzzy match, so only a record whose RR equals
    /// `record_prefix` counts.
    pub fn record_id_for(&self, record_prefix: &str) -> Option<&str> {
        self.domain_records
            .as_ref()?
            .record
            .iter()
            .find(|r| r.rr == record_prefix)
            .map(|r| r.record_id.as_str())
    }
}
