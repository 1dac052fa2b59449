//! Recording policy applied when no recorded exchange matches

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::fingerprint::RequestDescriptor;

/// Decision reached for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Serve the recorded response
    Replay,
    /// Perform the real call and capture it
    Record,
    /// Fail without calling the transport
    Refuse,
    /// Perform the real call without capturing it
    PassThrough,
}

/// What to do with a request the matcher could not serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissAction {
    /// Perform the real call and capture it
    Record,
    /// Fail without calling the transport
    Refuse,
    /// Perform the real call without capturing it
    PassThrough,
}

impl From<MissAction> for Disposition {
    fn from(action: MissAction) -> Self {
        match action {
            MissAction::Record => Self::Record,
            MissAction::Refuse => Self::Refuse,
            MissAction::PassThrough => Self::PassThrough,
        }
    }
}

/// Predicate deciding whether an unmatched request may be recorded
pub type RecordPredicate = Arc<dyn Fn(&RequestDescriptor) -> bool + Send + Sync>;

/// Decides what happens to requests the matcher could not serve
#[derive(Clone)]
pub struct RecordingPolicy {
    should_record: RecordPredicate,
    not_recorded_throws_errors: bool,
}

impl RecordingPolicy {
    /// Create a policy from a predicate and the refusal flag
    pub fn new<F>(should_record: F, not_recorded_throws_errors: bool) -> Self
    where
        F: Fn(&RequestDescriptor) -> bool + Send + Sync + 'static,
    {
        Self {
            should_record: Arc::new(should_record),
            not_recorded_throws_errors,
        }
    }

    /// Record every unmatched request
    #[must_use]
    pub fn record_all() -> Self {
        Self::new(|_| true, false)
    }

    /// Never record; refuse unmatched requests
    #[must_use]
    pub fn replay_only() -> Self {
        Self::new(|_| false, true)
    }

    /// Never record; forward unmatched requests untouched
    #[must_use]
    pub fn pass_through() -> Self {
        Self::new(|_| false, false)
    }

    /// Same predicate with a different refusal flag
    #[must_use]
    pub fn with_not_recorded_throws_errors(mut self, not_recorded_throws_errors: bool) -> Self {
        self.not_recorded_throws_errors = not_recorded_throws_errors;
        self
    }

    /// Whether unrecorded requests fail instead of passing through
    #[must_use]
    pub fn not_recorded_throws_errors(&self) -> bool {
        self.not_recorded_throws_errors
    }

    /// Whether this request may be recorded
    #[must_use]
    pub fn should_record(&self, request: &RequestDescriptor) -> bool {
        (self.should_record)(request)
    }

    /// Decide the disposition of a request that missed the matcher
    #[must_use]
    pub fn decide(&self, request: &RequestDescriptor) -> Disposition {
        self.on_miss(request).into()
    }

    /// Same decision, typed so that replay is not a possible answer
    #[must_use]
    pub fn on_miss(&self, request: &RequestDescriptor) -> MissAction {
        if self.should_record(request) {
            MissAction::Record
        } else if self.not_recorded_throws_errors {
            MissAction::Refuse
        } else {
            MissAction::PassThrough
        }
    }
}

impl Default for RecordingPolicy {
    fn default() -> Self {
        Self::record_all()
    }
}

impl fmt::Debug for RecordingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingPolicy")
            .field("not_recorded_throws_errors", &self.not_recorded_throws_errors)
            .finish_non_exhaustive()
    }
}

/// Declarative recording predicate
///
/// Empty allow-lists allow everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRule {
    /// Master switch
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Hosts that may be recorded (case-insensitive)
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Path prefixes that may be recorded
    #[serde(default)]
    pub path_prefixes: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for RecordRule {
    fn default() -> Self {
        Self {
            enabled: true,
            hosts: Vec::new(),
            path_prefixes: Vec::new(),
        }
    }
}

impl RecordRule {
    /// Check whether a request passes this rule
    #[must_use]
    pub fn allows(&self, request: &RequestDescriptor) -> bool {
        if !self.enabled {
            return false;
        }

        let host_ok = self.hosts.is_empty()
            || request
                .host()
                .is_some_and(|host| self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host)));

        let path_ok = self.path_prefixes.is_empty()
            || self
                .path_prefixes
                .iter()
                .any(|prefix| request.path().starts_with(prefix.as_str()));

        host_ok && path_ok
    }

    /// Turn the rule into a policy
    #[must_use]
    pub fn into_policy(self, not_recorded_throws_errors: bool) -> RecordingPolicy {
        RecordingPolicy::new(move |request| self.allows(request), not_recorded_throws_errors)
    }
}
