//! Request and response normalization into comparable descriptors

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::message::{Body, HttpResponse};
use crate::{Result, RewindError};

/// Header names (lowercased) mapped to their values in original order
pub type Headers = BTreeMap<String, Vec<String>>;

/// Canonical, comparable form of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: String,
    uri: String,
    body: String,
    headers: Headers,
}

impl RequestDescriptor {
    /// Rebuild a descriptor from persisted parts
    ///
    /// Method, URI and headers go through the same normalization as live
    /// requests, so hand-written or foreign records still match.
    #[must_use]
    pub fn normalized(method: &str, uri: &str, body: String, headers: Headers) -> Self {
        Self {
            method: normalize_method(method),
            uri: normalize_uri(uri),
            body,
            headers: regroup_headers(headers),
        }
    }

    /// Uppercased HTTP method
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Normalized URI
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Normalized body text
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Grouped headers
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Host component of the URI, if absolute
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        let (_, rest) = self.uri.split_once("://")?;
        let authority = rest.split(['/', '?']).next().unwrap_or(rest);
        let host_port = authority.rsplit('@').next().unwrap_or(authority);
        if host_port.starts_with('[') {
            // IPv6 literal, brackets kept
            return host_port.find(']').map(|end| &host_port[..=end]);
        }
        Some(host_port.split(':').next().unwrap_or(host_port))
    }

    /// Path component of the URI, always starting with `/`
    #[must_use]
    pub fn path(&self) -> &str {
        let without_query = self.uri.split('?').next().unwrap_or(&self.uri);
        match without_query.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
            None => without_query,
        }
    }

    /// SHA-256 digest over method, URI, headers and body
    ///
    /// Every field is length-prefixed so adjacent fields cannot alias.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();

        update_field(&mut hasher, &self.method);
        update_field(&mut hasher, &self.uri);

        hasher.update((self.headers.len() as u32).to_le_bytes());
        for (name, values) in &self.headers {
            update_field(&mut hasher, name);
            hasher.update((values.len() as u32).to_le_bytes());
            for value in values {
                update_field(&mut hasher, value);
            }
        }

        update_field(&mut hasher, &self.body);

        hasher.finalize().into()
    }
}

fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u32).to_le_bytes());
    hasher.update(field.as_bytes());
}

/// Canonical form of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    status: u16,
    status_text: String,
    headers: Headers,
    body: String,
}

impl ResponseDescriptor {
    /// Rebuild a descriptor from persisted parts, regrouping header names
    #[must_use]
    pub fn from_parts(status: u16, status_text: String, headers: Headers, body: String) -> Self {
        Self {
            status,
            status_text,
            headers: regroup_headers(headers),
            body,
        }
    }

    /// Normalize a live response without consuming it
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedBody` if the body cannot be rendered as text
    pub fn capture(response: &HttpResponse) -> Result<Self> {
        Ok(Self {
            status: response.status,
            status_text: response.status_text.clone(),
            headers: normalize_headers(&response.headers),
            body: normalize_body(&response.body)?,
        })
    }

    /// HTTP status code
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase
    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Grouped headers
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Body text
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Synthesize a live response carrying this descriptor's content
    #[must_use]
    pub fn to_response(&self) -> HttpResponse {
        let headers = self
            .headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.clone(), v.clone())))
            .collect();

        HttpResponse {
            status: self.status,
            status_text: self.status_text.clone(),
            headers,
            body: Body::Text(self.body.clone()),
        }
    }
}

/// Build a request descriptor from live request parts
///
/// # Errors
///
/// Returns `UnsupportedBody` if the body is a stream, a multipart
/// payload, or bytes that are not valid UTF-8
pub fn build(
    method: &str,
    uri: &str,
    body: &Body,
    headers: &[(String, String)],
) -> Result<RequestDescriptor> {
    Ok(RequestDescriptor {
        method: normalize_method(method),
        uri: normalize_uri(uri),
        body: normalize_body(body)?,
        headers: normalize_headers(headers),
    })
}

/// Render a body as comparable text
///
/// # Errors
///
/// Returns `UnsupportedBody` for payloads that cannot be materialized
pub fn normalize_body(body: &Body) -> Result<String> {
    match body {
        Body::Empty => Ok(String::new()),
        Body::Text(text) => Ok(text.clone()),
        Body::Bytes(bytes) => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| RewindError::UnsupportedBody(format!("binary body is not UTF-8: {e}"))),
        Body::Stream(_) => Err(RewindError::UnsupportedBody(
            "streaming body cannot be fingerprinted".to_string(),
        )),
        Body::Multipart { parts, .. } => Err(RewindError::UnsupportedBody(format!(
            "multipart body with {} part(s) cannot be fingerprinted",
            parts.len()
        ))),
    }
}

/// Group headers by lowercased name, keeping value order within a name
pub fn normalize_headers(headers: &[(String, String)]) -> Headers {
    let mut grouped = Headers::new();
    for (name, value) in headers {
        grouped
            .entry(name.trim().to_ascii_lowercase())
            .or_default()
            .push(value.trim().to_string());
    }
    grouped
}

/// Regroup an already grouped header map under normalized names
///
/// Names differing only in case are merged, in map order.
pub fn regroup_headers(headers: Headers) -> Headers {
    let mut grouped = Headers::new();
    for (name, values) in headers {
        grouped
            .entry(name.trim().to_ascii_lowercase())
            .or_default()
            .extend(values.into_iter().map(|v| v.trim().to_string()));
    }
    grouped
}

/// Uppercase and trim an HTTP method
pub fn normalize_method(method: &str) -> String {
    method.trim().to_uppercase()
}

/// Normalize a request URI
///
/// Drops the fragment, lowercases scheme and authority, defaults an empty
/// path to `/` and sorts query pairs by key. Pairs sharing a key keep their
/// relative order.
pub fn normalize_uri(uri: &str) -> String {
    let trimmed = uri.trim();
    let trimmed = trimmed.split('#').next().unwrap_or(trimmed);

    let (base, query) = match trimmed.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (trimmed, None),
    };

    let mut normalized = match base.split_once("://") {
        Some((scheme, rest)) => {
            let (authority, path) = match rest.find('/') {
                Some(i) => rest.split_at(i),
                None => (rest, ""),
            };
            format!(
                "{}://{}{}",
                scheme.to_ascii_lowercase(),
                normalize_authority(authority),
                normalize_path(path)
            )
        }
        None => normalize_path(base),
    };

    if let Some(query) = query {
        let mut pairs: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
        pairs.sort_by(|a, b| query_key(a).cmp(query_key(b)));
        if !pairs.is_empty() {
            normalized.push('?');
            normalized.push_str(&pairs.join("&"));
        }
    }

    normalized
}

/// Lowercase the host, keeping userinfo as written
fn normalize_authority(authority: &str) -> String {
    match authority.rsplit_once('@') {
        Some((userinfo, host)) => format!("{userinfo}@{}", host.to_ascii_lowercase()),
        None => authority.to_ascii_lowercase(),
    }
}

fn query_key(pair: &str) -> &str {
    pair.split('=').next().unwrap_or(pair)
}

/// Normalize a URL path
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();

    // Ensure leading slash
    if trimmed.is_empty() || !trimmed.starts_with('/') {
        format!("/{trimmed}")
    } else {
        trimmed.to_string()
    }
}
