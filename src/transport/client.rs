//! Plain-HTTP transport backed by the hyper client

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::Transport;
use crate::message::{Body, HttpRequest, HttpResponse, Part};
use crate::{Result, RewindError};

type RequestBody = UnsyncBoxBody<Bytes, io::Error>;
type PooledClient = Client<HttpConnector, RequestBody>;

/// HTTP client for performing real calls
///
/// `close()` drops the pooled client, releasing idle connections; requests
/// already in flight keep their own handle and finish normally.
pub struct HyperClient {
    client: Mutex<Option<PooledClient>>,
}

impl HyperClient {
    /// Create a new HTTP client
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build_http();

        Self {
            client: Mutex::new(Some(client)),
        }
    }

    /// Check if `close()` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.client.lock().is_none()
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HyperClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let client = self
            .client
            .lock()
            .clone()
            .ok_or(RewindError::TransportClosed)?;

        let uri = request
            .uri
            .trim()
            .parse::<Uri>()
            .map_err(|e| RewindError::Transport(format!("Invalid URI '{}': {e}", request.uri)))?;

        let method = request.method.trim().parse::<Method>().map_err(|e| {
            RewindError::Transport(format!("Invalid HTTP method '{}': {e}", request.method))
        })?;

        debug!("Sending {} {}", method, uri);

        let mut request_builder = Request::builder().method(method).uri(uri);

        if let Body::Multipart { boundary, .. } = &request.body {
            let has_content_type = request
                .headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
            if !has_content_type {
                request_builder = request_builder.header(
                    hyper::header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                );
            }
        }

        for (name, value) in &request.headers {
            request_builder = request_builder.header(name.as_str(), value.as_str());
        }

        let http_request = request_builder
            .body(into_request_body(request.body))
            .map_err(|e| RewindError::Transport(format!("Failed to build request: {e}")))?;

        let response = client.request(http_request).await.map_err(|e| {
            warn!("Request failed: {e}");
            RewindError::Transport(format!("Request failed: {e}"))
        })?;

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| RewindError::Transport(format!("Failed to read response body: {e}")))?
            .to_bytes();

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: Body::Bytes(body_bytes),
        })
    }

    async fn close(&self) -> Result<()> {
        if self.client.lock().take().is_some() {
            info!("HTTP transport closed, connection pool released");
        }
        Ok(())
    }
}

/// Convert a caller body into a hyper request body
fn into_request_body(body: Body) -> RequestBody {
    match body {
        Body::Empty => Empty::<Bytes>::new()
            .map_err(|never| match never {})
            .boxed_unsync(),
        Body::Text(text) => full(Bytes::from(text)),
        Body::Bytes(bytes) => full(bytes),
        Body::Stream(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
        Body::Multipart { boundary, parts } => full(encode_multipart(&boundary, &parts)),
    }
}

fn full(bytes: Bytes) -> RequestBody {
    Full::new(bytes)
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Encode multipart parts as `multipart/form-data`
fn encode_multipart(boundary: &str, parts: &[Part]) -> Bytes {
    let mut data = Vec::new();

    for part in parts {
        data.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        data.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
        );
        if let Some(content_type) = &part.content_type {
            data.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        data.extend_from_slice(b"\r\n");
        data.extend_from_slice(&part.data);
        data.extend_from_slice(b"\r\n");
    }
    data.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Bytes::from(data)
}
