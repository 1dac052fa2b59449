//! Structured per-request events

use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Something the backend did with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcrEvent {
    /// Served from the cassette
    Replayed {
        /// Request method
        method: String,
        /// Normalized URI
        uri: String,
    },
    /// Real call performed and captured
    Recorded {
        /// Request method
        method: String,
        /// Normalized URI
        uri: String,
        /// Live response status
        status: u16,
    },
    /// Real call performed, response could not be captured
    CaptureSkipped {
        /// Request method
        method: String,
        /// Normalized URI
        uri: String,
        /// Why capture failed
        reason: String,
    },
    /// Real call performed without capture
    PassedThrough {
        /// Request method
        method: String,
        /// Normalized URI
        uri: String,
    },
    /// Request refused by policy
    Refused {
        /// Request method
        method: String,
        /// Normalized URI
        uri: String,
    },
    /// Cassette written at shutdown
    Flushed {
        /// Exchanges captured this session
        recorded: usize,
    },
    /// Cassette write failed at shutdown
    FlushFailed {
        /// Error message
        reason: String,
    },
}

/// Receives backend events
pub trait Observer: Send + Sync {
    /// Handle one event
    fn on_event(&self, event: &VcrEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &VcrEvent) {
        match event {
            VcrEvent::Replayed { method, uri } => debug!("Replayed {method} {uri}"),
            VcrEvent::Recorded {
                method,
                uri,
                status,
            } => info!("Recorded {method} {uri} -> {status}"),
            VcrEvent::CaptureSkipped {
                method,
                uri,
                reason,
            } => warn!("Not capturing {method} {uri}: {reason}"),
            VcrEvent::PassedThrough { method, uri } => debug!("Passed through {method} {uri}"),
            VcrEvent::Refused { method, uri } => warn!("Refused unrecorded {method} {uri}"),
            VcrEvent::Flushed { recorded } => info!("Cassette flushed ({recorded} new)"),
            VcrEvent::FlushFailed { reason } => warn!("Cassette flush failed: {reason}"),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<VcrEvent>>,
}

impl CollectingObserver {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen so far
    #[must_use]
    pub fn events(&self) -> Vec<VcrEvent> {
        self.events.lock().clone()
    }
}

impl Observer for CollectingObserver {
    fn on_event(&self, event: &VcrEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_observer_keeps_order() {
        let observer = CollectingObserver::new();
        observer.on_event(&VcrEvent::Flushed { recorded: 1 });
        observer.on_event(&VcrEvent::FlushFailed {
            reason: "disk full".to_string(),
        });

        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], VcrEvent::Flushed { recorded: 1 });
    }
}
