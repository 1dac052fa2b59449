//! Transport capability consumed by the backend
//!
//! The backend is generic over anything that can send a request and be
//! closed. `HyperClient` is the default plain-HTTP implementation; TLS or
//! mock transports plug in through the same trait.

mod client;

pub use client::HyperClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::message::{HttpRequest, HttpResponse};
use crate::Result;

/// Performs real HTTP calls
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for its response
    ///
    /// # Errors
    ///
    /// Returns error if the call fails
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Release underlying resources
    ///
    /// # Errors
    ///
    /// Returns error if releasing fails
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send(request).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send(request).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
