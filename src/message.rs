//! Live HTTP messages exchanged with the transport

use std::fmt;
use std::io;

use bytes::Bytes;
use futures_util::stream::BoxStream;

/// Streaming body chunks
pub type BodyStream = BoxStream<'static, std::result::Result<Bytes, io::Error>>;

/// One part of a multipart payload
#[derive(Debug, Clone)]
pub struct Part {
    /// Form field name
    pub name: String,
    /// Optional part content type
    pub content_type: Option<String>,
    /// Raw part data
    pub data: Bytes,
}

/// Message body as seen by the caller
#[derive(Default)]
pub enum Body {
    /// No body
    #[default]
    Empty,
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Bytes(Bytes),
    /// Unconsumed stream
    Stream(BodyStream),
    /// Multipart form
    Multipart {
        /// Boundary separating parts
        boundary: String,
        /// Parts in wire order
        parts: Vec<Part>,
    },
}

impl Body {
    /// Check if the body carries no payload
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Stream(_) | Self::Multipart { .. } => false,
        }
    }

    /// Short description used in logs and errors
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Stream(_) => "stream",
            Self::Multipart { .. } => "multipart",
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Multipart { boundary, parts } => f
                .debug_struct("Multipart")
                .field("boundary", boundary)
                .field("parts", &parts.len())
                .finish(),
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

/// Outgoing HTTP request
#[derive(Debug, Default)]
pub struct HttpRequest {
    /// HTTP method (e.g., "GET", "POST")
    pub method: String,
    /// Absolute request URI
    pub uri: String,
    /// Headers in wire order, repeats allowed
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Body,
}

impl HttpRequest {
    /// Create a request with no headers and an empty body
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Append a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }
}

/// HTTP response returned to the caller
#[derive(Debug, Default)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase
    pub status_text: String,
    /// Headers in wire order, repeats allowed
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Body,
}

impl HttpResponse {
    /// Create a response with no headers and an empty body
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Append a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header, matched case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as text, if it was materialized as text or valid UTF-8 bytes
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            Body::Empty => Some(""),
            Body::Text(text) => Some(text),
            Body::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            Body::Stream(_) | Body::Multipart { .. } => None,
        }
    }
}
