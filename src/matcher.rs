//! Matching live requests against recorded exchanges

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cassette::{Cassette, Exchange};
use crate::fingerprint::RequestDescriptor;

/// Projection of a request used to group comparable exchanges
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchKey(Vec<String>);

impl MatchKey {
    /// Create a key from its components
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Key components
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Derives a match key from a request
pub trait KeyStrategy: Send + Sync {
    /// Project a request onto its match key
    fn key(&self, request: &RequestDescriptor) -> MatchKey;
}

impl<F> KeyStrategy for F
where
    F: Fn(&RequestDescriptor) -> MatchKey + Send + Sync,
{
    fn key(&self, request: &RequestDescriptor) -> MatchKey {
        self(request)
    }
}

/// Built-in key strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Method and normalized URI
    #[default]
    MethodUri,
    /// Method, normalized URI and body text
    MethodUriBody,
    /// Full request fingerprint, headers included
    Fingerprint,
}

impl KeyStrategy for KeyKind {
    fn key(&self, request: &RequestDescriptor) -> MatchKey {
        match self {
            Self::MethodUri => MatchKey::new([request.method(), request.uri()]),
            Self::MethodUriBody => MatchKey::new([request.method(), request.uri(), request.body()]),
            Self::Fingerprint => MatchKey::new([hex::encode(request.fingerprint())]),
        }
    }
}

/// Finds the recorded exchange to replay for a request
pub trait Matcher: Send + Sync {
    /// Return the exchange to replay, or `None` on a miss
    fn find(&self, request: &RequestDescriptor, cassette: &Cassette) -> Option<Exchange>;

    /// Forget what has been consumed so replay starts over
    fn reset(&self);

    /// Lookup counters
    fn stats(&self) -> MatchStats;
}

/// Matcher lookup counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchStats {
    /// Lookups served from the cassette
    pub hits: usize,
    /// Lookups with no remaining exchange
    pub misses: usize,
    /// Hit rate (0.0 to 1.0)
    pub hit_rate: f64,
}

/// Queue-ordered matcher
///
/// Exchanges sharing a key form a queue in recorded order. Each lookup takes
/// the earliest exchange not yet replayed in this session; once a queue is
/// drained further lookups miss.
///
/// Queues are built from the cassette on the first lookup, so each stored
/// exchange is keyed once per cassette rather than once per request.
pub struct QueueMatcher<K = KeyKind> {
    strategy: K,
    queues: DashMap<MatchKey, Queue>,
    /// Cassette the queues were built from
    indexed: RwLock<Option<CassetteId>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Recorded positions sharing one key
#[derive(Debug, Default)]
struct Queue {
    positions: Vec<usize>,
    consumed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CassetteId {
    data: usize,
    len: usize,
}

impl CassetteId {
    fn of(cassette: &Cassette) -> Self {
        Self {
            data: cassette.interactions().as_ptr() as usize,
            len: cassette.len(),
        }
    }
}

impl QueueMatcher<KeyKind> {
    /// Matcher keyed by method and URI
    #[must_use]
    pub fn method_uri() -> Self {
        Self::new(KeyKind::MethodUri)
    }
}

impl Default for QueueMatcher<KeyKind> {
    fn default() -> Self {
        Self::method_uri()
    }
}

impl<K: KeyStrategy> QueueMatcher<K> {
    /// Create a matcher over a key strategy
    pub fn new(strategy: K) -> Self {
        Self {
            strategy,
            queues: DashMap::new(),
            indexed: RwLock::new(None),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Key strategy in use
    pub fn strategy(&self) -> &K {
        &self.strategy
    }

    /// Number of exchanges still queued for a request's key
    pub fn remaining(&self, request: &RequestDescriptor, cassette: &Cassette) -> usize {
        let key = self.strategy.key(request);
        let _index = self.index(cassette);
        self.queues
            .get(&key)
            .map_or(0, |queue| queue.positions.len().saturating_sub(queue.consumed))
    }

    /// Build the queues for `cassette` unless they already are
    ///
    /// The returned guard keeps the queues from being rebuilt while held.
    fn index(&self, cassette: &Cassette) -> RwLockReadGuard<'_, Option<CassetteId>> {
        let id = CassetteId::of(cassette);

        let current = self.indexed.read();
        if *current == Some(id) {
            return current;
        }
        drop(current);

        let mut current = self.indexed.write();
        if *current != Some(id) {
            self.queues.clear();
            for (position, exchange) in cassette.interactions().iter().enumerate() {
                self.queues
                    .entry(self.strategy.key(exchange.request()))
                    .or_default()
                    .positions
                    .push(position);
            }
            *current = Some(id);
            debug!(
                "Indexed {} exchanges under {} keys",
                cassette.len(),
                self.queues.len()
            );
        }
        RwLockWriteGuard::downgrade(current)
    }
}

impl<K: KeyStrategy> Matcher for QueueMatcher<K> {
    fn find(&self, request: &RequestDescriptor, cassette: &Cassette) -> Option<Exchange> {
        let key = self.strategy.key(request);
        let _index = self.index(cassette);

        // The queue guard holds the shard lock, so concurrent lookups on the
        // same key cannot take the same position. Keys with no recorded
        // exchange have no queue and are never inserted.
        let position = self.queues.get_mut(&key).and_then(|mut queue| {
            let position = queue.positions.get(queue.consumed).copied()?;
            queue.consumed += 1;
            Some(position)
        });
        let found = position.and_then(|p| cassette.interactions().get(p).cloned());

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Match hit: {key}");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Match miss: {key}");
        }

        found
    }

    fn reset(&self) {
        for mut queue in self.queues.iter_mut() {
            queue.consumed = 0;
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    fn stats(&self) -> MatchStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        MatchStats {
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}

/// Group sizes per key, in first-seen order
pub fn group_sizes(strategy: &dyn KeyStrategy, cassette: &Cassette) -> Vec<(MatchKey, usize)> {
    let mut groups: Vec<(MatchKey, usize)> = Vec::new();
    for exchange in cassette.interactions() {
        let key = strategy.key(exchange.request());
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => groups.push((key, 1)),
        }
    }
    groups
}
