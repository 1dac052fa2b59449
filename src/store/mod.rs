//! Record store: loaded cassette plus exchanges captured this session

mod format;
mod reader;
mod writer;

pub use format::{
    validate_version, CassetteCodec, CassetteFile, InteractionRecord, JsonCodec, FORMAT_VERSION,
};
pub use reader::load;
pub use writer::write_atomic;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cassette::{Cassette, Exchange};
use crate::{Result, RewindError};

/// Owns one cassette for the duration of a session
///
/// Lookups read the loaded half, which never changes. New exchanges go to a
/// separate append-only list, so appends never block lookups.
pub struct RecordStore {
    loaded: Cassette,
    appended: Mutex<Vec<Exchange>>,
    codec: Arc<dyn CassetteCodec>,
    flushed: AtomicBool,
}

impl RecordStore {
    /// Load the cassette at `location` using the JSON codec
    ///
    /// # Errors
    ///
    /// Returns error if an existing cassette cannot be read or decoded
    pub fn load(location: impl Into<PathBuf>) -> Result<Self> {
        Self::load_with_codec(location, Arc::new(JsonCodec))
    }

    /// Load the cassette at `location` with a custom codec
    ///
    /// # Errors
    ///
    /// Returns error if an existing cassette cannot be read or decoded
    pub fn load_with_codec(
        location: impl Into<PathBuf>,
        codec: Arc<dyn CassetteCodec>,
    ) -> Result<Self> {
        let location = location.into();
        let loaded = reader::load(&location, codec.as_ref())?;
        Ok(Self::from_cassette(loaded, codec))
    }

    /// Wrap an already loaded cassette
    #[must_use]
    pub fn from_cassette(loaded: Cassette, codec: Arc<dyn CassetteCodec>) -> Self {
        Self {
            loaded,
            appended: Mutex::new(Vec::new()),
            codec,
            flushed: AtomicBool::new(false),
        }
    }

    /// The cassette as loaded at startup
    #[must_use]
    pub fn cassette(&self) -> &Cassette {
        &self.loaded
    }

    /// Storage location
    #[must_use]
    pub fn location(&self) -> &Path {
        self.loaded.location()
    }

    /// Number of exchanges loaded at startup
    #[must_use]
    pub fn loaded_len(&self) -> usize {
        self.loaded.len()
    }

    /// Number of exchanges captured this session
    #[must_use]
    pub fn recorded_count(&self) -> usize {
        self.appended.lock().len()
    }

    /// Snapshot of exchanges captured this session, in append order
    #[must_use]
    pub fn recorded(&self) -> Vec<Exchange> {
        self.appended.lock().clone()
    }

    /// Append a newly captured exchange
    pub fn append(&self, exchange: Exchange) {
        if self.flushed.load(Ordering::Acquire) {
            warn!(
                "Exchange {} {} captured after flush will not be persisted",
                exchange.request().method(),
                exchange.request().uri()
            );
        }

        let count = {
            let mut appended = self.appended.lock();
            appended.push(exchange);
            appended.len()
        };

        debug!("Appended exchange (session count: {count})");
    }

    /// Persist loaded then appended exchanges
    ///
    /// Only the first successful call writes. With nothing appended the
    /// stored file is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if encoding or writing fails
    pub fn flush(&self) -> Result<()> {
        if self.flushed.swap(true, Ordering::AcqRel) {
            debug!("Cassette {} already flushed", self.location().display());
            return Ok(());
        }

        let result = self.write();
        if result.is_err() {
            self.flushed.store(false, Ordering::Release);
        }
        result
    }

    fn write(&self) -> Result<()> {
        let appended = self.recorded();
        if appended.is_empty() {
            debug!(
                "No new exchanges, leaving {} unchanged",
                self.location().display()
            );
            return Ok(());
        }

        let mut merged = Vec::with_capacity(self.loaded.len() + appended.len());
        merged.extend_from_slice(self.loaded.interactions());
        merged.extend(appended);

        let bytes = self
            .codec
            .encode(&merged)
            .map_err(|e| self.persistence_error(&e))?;
        write_atomic(self.location(), &bytes).map_err(|e| self.persistence_error(&e))?;

        info!(
            "Persisted cassette '{}': {} interactions ({} new)",
            self.location().display(),
            merged.len(),
            merged.len() - self.loaded.len()
        );

        Ok(())
    }

    fn persistence_error(&self, cause: &RewindError) -> RewindError {
        RewindError::Persistence {
            path: self.location().display().to_string(),
            reason: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{self, ResponseDescriptor};
    use crate::message::{Body, HttpResponse};
    use std::thread;
    use tempfile::TempDir;

    fn exchange(path: &str) -> Exchange {
        let request =
            fingerprint::build("GET", &format!("http://example.com{path}"), &Body::Empty, &[])
                .unwrap();
        let response =
            ResponseDescriptor::capture(&HttpResponse::new(200, "OK").with_body(path)).unwrap();
        Exchange::new(request, response)
    }

    #[test]
    fn test_load_missing_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::load(temp_dir.path().join("missing.json")).unwrap();

        assert_eq!(store.loaded_len(), 0);
        assert_eq!(store.recorded_count(), 0);
    }

    #[test]
    fn test_flush_merges_loaded_then_appended() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cassette.json");

        {
            let store = RecordStore::load(&path).unwrap();
            store.append(exchange("/one"));
            store.append(exchange("/two"));
            store.flush().unwrap();
        }

        let store = RecordStore::load(&path).unwrap();
        assert_eq!(store.loaded_len(), 2);
        store.append(exchange("/three"));
        store.flush().unwrap();

        let reloaded = RecordStore::load(&path).unwrap();
        let uris: Vec<_> = reloaded
            .cassette()
            .interactions()
            .iter()
            .map(|e| e.request().uri().to_string())
            .collect();
        assert_eq!(
            uris,
            vec![
                "http://example.com/one",
                "http://example.com/two",
                "http://example.com/three"
            ]
        );
    }

    #[test]
    fn test_flush_without_new_exchanges_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cassette.json");

        let store = RecordStore::load(&path).unwrap();
        store.append(exchange("/one"));
        store.flush().unwrap();
        let before = std::fs::read(&path).unwrap();

        let store = RecordStore::load(&path).unwrap();
        store.flush().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_flush_without_anything_creates_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cassette.json");

        RecordStore::load(&path).unwrap().flush().unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn test_second_flush_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cassette.json");

        let store = RecordStore::load(&path).unwrap();
        store.append(exchange("/one"));
        store.flush().unwrap();
        std::fs::remove_file(&path).unwrap();

        store.flush().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_flush_reports_persistence_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let store = RecordStore::from_cassette(
            Cassette::empty(blocker.join("cassette.json")),
            Arc::new(JsonCodec),
        );
        store.append(exchange("/one"));

        let err = store.flush().unwrap_err();
        assert!(matches!(err, RewindError::Persistence { .. }));
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cassette.json");
        let store = Arc::new(RecordStore::load(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..25 {
                        store.append(exchange(&format!("/t{t}/r{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.recorded_count(), 200);
        store.flush().unwrap();

        let reloaded = RecordStore::load(&path).unwrap();
        assert_eq!(reloaded.loaded_len(), 200);
        let mut uris: Vec<_> = reloaded
            .cassette()
            .interactions()
            .iter()
            .map(|e| e.request().uri().to_string())
            .collect();
        uris.sort();
        uris.dedup();
        assert_eq!(uris.len(), 200);
    }
}
