//! Persisted cassette format and codecs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cassette::Exchange;
use crate::fingerprint::{Headers, RequestDescriptor, ResponseDescriptor};
use crate::{Result, RewindError};

/// Current cassette format version
pub const FORMAT_VERSION: u32 = 1;

/// One persisted interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    /// Request method
    pub method: String,
    /// Normalized request URI
    pub uri: String,
    /// Request body text
    #[serde(default)]
    pub request_body: String,
    /// Request headers, name to values
    #[serde(default)]
    pub request_headers: Headers,
    /// Response status code
    pub status_code: u16,
    /// Response reason phrase
    #[serde(default)]
    pub status_text: String,
    /// Response headers, name to values
    #[serde(default)]
    pub response_headers: Headers,
    /// Response body text
    #[serde(default)]
    pub response_body: String,
    /// Capture time (RFC 3339)
    pub recorded_at: DateTime<Utc>,
}

impl From<&Exchange> for InteractionRecord {
    fn from(exchange: &Exchange) -> Self {
        let request = exchange.request();
        let response = exchange.response();
        Self {
            method: request.method().to_string(),
            uri: request.uri().to_string(),
            request_body: request.body().to_string(),
            request_headers: request.headers().clone(),
            status_code: response.status(),
            status_text: response.status_text().to_string(),
            response_headers: response.headers().clone(),
            response_body: response.body().to_string(),
            recorded_at: exchange.recorded_at(),
        }
    }
}

impl From<InteractionRecord> for Exchange {
    fn from(record: InteractionRecord) -> Self {
        let request = RequestDescriptor::normalized(
            &record.method,
            &record.uri,
            record.request_body,
            record.request_headers,
        );
        let response = ResponseDescriptor::from_parts(
            record.status_code,
            record.status_text,
            record.response_headers,
            record.response_body,
        );
        Exchange::with_timestamp(request, response, record.recorded_at)
    }
}

/// Top-level persisted document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CassetteFile {
    /// Format version
    pub version: u32,
    /// Interactions in recorded order
    pub interactions: Vec<InteractionRecord>,
}

/// Validate a persisted format version
///
/// # Errors
///
/// Returns error if the version is not supported
pub fn validate_version(version: u32) -> Result<()> {
    if version != FORMAT_VERSION {
        return Err(RewindError::InvalidFormat(format!(
            "Unsupported version: {version}, expected {FORMAT_VERSION}"
        )));
    }
    Ok(())
}

/// Converts exchanges to and from their persisted bytes
pub trait CassetteCodec: Send + Sync {
    /// Decode persisted bytes into exchanges, in stored order
    ///
    /// # Errors
    ///
    /// Returns error if the content is malformed
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Exchange>>;

    /// Encode exchanges, in the given order
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    fn encode(&self, interactions: &[Exchange]) -> Result<Vec<u8>>;
}

/// Pretty-printed JSON codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl CassetteCodec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Exchange>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let file: CassetteFile = serde_json::from_slice(bytes)
            .map_err(|e| RewindError::InvalidFormat(format!("Failed to parse cassette: {e}")))?;
        validate_version(file.version)?;

        Ok(file.interactions.into_iter().map(Exchange::from).collect())
    }

    fn encode(&self, interactions: &[Exchange]) -> Result<Vec<u8>> {
        let file = CassetteFile {
            version: FORMAT_VERSION,
            interactions: interactions.iter().map(InteractionRecord::from).collect(),
        };

        let mut bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| RewindError::InvalidFormat(format!("Failed to encode cassette: {e}")))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
