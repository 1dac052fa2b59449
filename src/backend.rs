//! Record/replay backend wrapping a real transport

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cassette::Exchange;
use crate::config::VcrOptions;
use crate::fingerprint::{self, RequestDescriptor, ResponseDescriptor};
use crate::matcher::{MatchStats, Matcher};
use crate::message::{HttpRequest, HttpResponse};
use crate::observer::{Observer, VcrEvent};
use crate::policy::{MissAction, RecordingPolicy};
use crate::store::RecordStore;
use crate::transport::Transport;
use crate::{Result, RewindError};

/// Header added to every replayed response
pub const CACHE_HEADER: &str = "x-vcr-cache";

/// How a successful call was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the cassette
    Replayed,
    /// Real call, captured
    Recorded,
    /// Real call, response could not be captured
    CaptureSkipped,
    /// Real call, not captured by policy
    PassedThrough,
}

/// Backend statistics
#[derive(Debug, Clone, Copy)]
pub struct BackendStats {
    /// Matcher counters
    pub matches: MatchStats,
    /// Exchanges loaded at startup
    pub loaded: usize,
    /// Exchanges captured this session
    pub recorded: usize,
}

/// Serves requests from a cassette, falling back to a real transport
pub struct VcrBackend<T> {
    transport: T,
    store: RecordStore,
    matcher: Arc<dyn Matcher>,
    policy: RecordingPolicy,
    observer: Arc<dyn Observer>,
}

impl<T: Transport> VcrBackend<T> {
    /// Load the cassette and wrap `transport`
    ///
    /// # Errors
    ///
    /// Returns error if an existing cassette cannot be read or decoded
    pub fn new(options: VcrOptions, transport: T) -> Result<Self> {
        let store = RecordStore::load_with_codec(options.recording_path, options.codec)?;

        info!(
            "Backend ready: {} ({} recorded interactions)",
            store.location().display(),
            store.loaded_len()
        );

        Ok(Self {
            transport,
            store,
            matcher: options.matcher,
            policy: options.policy,
            observer: options.observer,
        })
    }

    /// Handle a request
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedBody` if the request cannot be fingerprinted,
    /// `RecordingDisabled` if policy refuses it, or the transport's error
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.send_with_outcome(request)
            .await
            .map(|(response, _)| response)
    }

    /// Handle a request and report how it was served
    ///
    /// # Errors
    ///
    /// Same as [`VcrBackend::send`]
    pub async fn send_with_outcome(
        &self,
        request: HttpRequest,
    ) -> Result<(HttpResponse, Outcome)> {
        let descriptor = fingerprint::build(
            &request.method,
            &request.uri,
            &request.body,
            &request.headers,
        )?;

        debug!("Handling {} {}", descriptor.method(), descriptor.uri());

        if let Some(exchange) = self.matcher.find(&descriptor, self.store.cassette()) {
            self.emit(VcrEvent::Replayed {
                method: descriptor.method().to_string(),
                uri: descriptor.uri().to_string(),
            });
            return Ok((replay_response(&exchange), Outcome::Replayed));
        }

        match self.policy.on_miss(&descriptor) {
            MissAction::Record => self.record(descriptor, request).await,
            MissAction::PassThrough => {
                let response = self.transport.send(request).await?;
                self.emit(VcrEvent::PassedThrough {
                    method: descriptor.method().to_string(),
                    uri: descriptor.uri().to_string(),
                });
                Ok((response, Outcome::PassedThrough))
            }
            MissAction::Refuse => {
                self.emit(VcrEvent::Refused {
                    method: descriptor.method().to_string(),
                    uri: descriptor.uri().to_string(),
                });
                Err(RewindError::RecordingDisabled {
                    method: descriptor.method().to_string(),
                    uri: descriptor.uri().to_string(),
                })
            }
        }
    }

    /// Perform the real call and capture it
    async fn record(
        &self,
        descriptor: RequestDescriptor,
        request: HttpRequest,
    ) -> Result<(HttpResponse, Outcome)> {
        let response = self.transport.send(request).await?;

        match ResponseDescriptor::capture(&response) {
            Ok(captured) => {
                self.emit(VcrEvent::Recorded {
                    method: descriptor.method().to_string(),
                    uri: descriptor.uri().to_string(),
                    status: captured.status(),
                });
                self.store.append(Exchange::new(descriptor, captured));
                Ok((response, Outcome::Recorded))
            }
            Err(e) => {
                self.emit(VcrEvent::CaptureSkipped {
                    method: descriptor.method().to_string(),
                    uri: descriptor.uri().to_string(),
                    reason: e.to_string(),
                });
                Ok((response, Outcome::CaptureSkipped))
            }
        }
    }

    /// Flush the cassette, then close the transport
    ///
    /// Neither step's failure is propagated; both are reported to the
    /// observer or logged, and the transport is closed even if the flush
    /// failed.
    pub async fn shutdown(&self) {
        match self.store.flush() {
            Ok(()) => self.emit(VcrEvent::Flushed {
                recorded: self.store.recorded_count(),
            }),
            Err(e) => self.emit(VcrEvent::FlushFailed {
                reason: e.to_string(),
            }),
        }

        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport: {e}");
        }
    }

    /// Rewind replay so recorded exchanges are served again from the start
    pub fn reset_matcher(&self) {
        info!("Resetting matcher");
        self.matcher.reset();
    }

    /// Current statistics
    #[must_use]
    pub fn stats(&self) -> BackendStats {
        BackendStats {
            matches: self.matcher.stats(),
            loaded: self.store.loaded_len(),
            recorded: self.store.recorded_count(),
        }
    }

    /// The record store
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The wrapped transport
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn emit(&self, event: VcrEvent) {
        self.observer.on_event(&event);
    }
}

/// Synthesize a replayed response tagged with the cache header
fn replay_response(exchange: &Exchange) -> HttpResponse {
    exchange
        .response()
        .to_response()
        .with_header(CACHE_HEADER, "true")
}
