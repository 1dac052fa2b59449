//! Exchanges and the cassette that holds them

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::fingerprint::{RequestDescriptor, ResponseDescriptor};

/// One captured request/response pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    request: RequestDescriptor,
    response: ResponseDescriptor,
    recorded_at: DateTime<Utc>,
}

impl Exchange {
    /// Create an exchange stamped with the current time
    #[must_use]
    pub fn new(request: RequestDescriptor, response: ResponseDescriptor) -> Self {
        Self::with_timestamp(request, response, Utc::now())
    }

    /// Create an exchange with an explicit timestamp
    #[must_use]
    pub fn with_timestamp(
        request: RequestDescriptor,
        response: ResponseDescriptor,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request,
            response,
            recorded_at,
        }
    }

    /// Recorded request
    #[must_use]
    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    /// Recorded response
    #[must_use]
    pub fn response(&self) -> &ResponseDescriptor {
        &self.response
    }

    /// Capture time
    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// Ordered exchanges bound to one storage location
#[derive(Debug, Clone)]
pub struct Cassette {
    location: PathBuf,
    interactions: Vec<Exchange>,
}

impl Cassette {
    /// Create a cassette from exchanges in recorded order
    #[must_use]
    pub fn new(location: impl Into<PathBuf>, interactions: Vec<Exchange>) -> Self {
        Self {
            location: location.into(),
            interactions,
        }
    }

    /// Create an empty cassette
    #[must_use]
    pub fn empty(location: impl Into<PathBuf>) -> Self {
        Self::new(location, Vec::new())
    }

    /// Storage location
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Exchanges in recorded order
    #[must_use]
    pub fn interactions(&self) -> &[Exchange] {
        &self.interactions
    }

    /// Number of exchanges
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Check if the cassette holds no exchanges
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}
