//! Rewind - record/replay layer for HTTP clients
//!
//! Wraps a real transport: requests that match a recorded exchange are
//! answered from the cassette, the rest are recorded, refused or passed
//! through according to the recording policy.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::multiple_crate_versions
)]

pub mod backend;
pub mod cassette;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod matcher;
pub mod message;
pub mod observer;
pub mod policy;
pub mod store;
pub mod transport;

pub use backend::{BackendStats, Outcome, VcrBackend, CACHE_HEADER};
pub use cassette::{Cassette, Exchange};
pub use config::{Config, VcrOptions};
pub use error::{Result, RewindError};
pub use fingerprint::{RequestDescriptor, ResponseDescriptor};
pub use matcher::{KeyKind, Matcher, QueueMatcher};
pub use message::{Body, HttpRequest, HttpResponse};
pub use policy::{Disposition, MissAction, RecordingPolicy};
pub use transport::{HyperClient, Transport};
