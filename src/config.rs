//! Configuration types for Rewind

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::fingerprint::RequestDescriptor;
use crate::matcher::{KeyKind, KeyStrategy, Matcher, QueueMatcher};
use crate::observer::{Observer, TracingObserver};
use crate::policy::{RecordRule, RecordingPolicy};
use crate::store::{CassetteCodec, JsonCodec};
use crate::{Result, RewindError};

/// File-based configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cassette storage location
    pub recording_path: PathBuf,
    /// Key strategy for the queue matcher
    #[serde(default)]
    pub matcher: KeyKind,
    /// Fail unmatched, unrecordable requests instead of passing them through
    #[serde(default)]
    pub not_recorded_throws_errors: bool,
    /// Which unmatched requests may be recorded
    #[serde(default)]
    pub record: RecordRule,
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RewindError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| RewindError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.recording_path.as_os_str().is_empty() {
            return Err(RewindError::ConfigError(
                "recording_path cannot be empty".to_string(),
            ));
        }

        if self.recording_path.is_dir() {
            return Err(RewindError::ConfigError(format!(
                "recording_path is a directory: {}",
                self.recording_path.display()
            )));
        }

        for (i, host) in self.record.hosts.iter().enumerate() {
            if host.trim().is_empty() {
                return Err(RewindError::ConfigError(format!(
                    "record.hosts[{i}] cannot be empty"
                )));
            }
        }

        for (i, prefix) in self.record.path_prefixes.iter().enumerate() {
            if !prefix.starts_with('/') {
                return Err(RewindError::ConfigError(format!(
                    "record.path_prefixes[{i}] must start with '/': {prefix}"
                )));
            }
        }

        Ok(())
    }
}

/// Runtime options for a backend
pub struct VcrOptions {
    pub(crate) recording_path: PathBuf,
    pub(crate) matcher: Arc<dyn Matcher>,
    pub(crate) policy: RecordingPolicy,
    pub(crate) codec: Arc<dyn CassetteCodec>,
    pub(crate) observer: Arc<dyn Observer>,
}

impl VcrOptions {
    /// Options recording every unmatched request to `recording_path`
    pub fn new(recording_path: impl Into<PathBuf>) -> Self {
        Self {
            recording_path: recording_path.into(),
            matcher: Arc::new(QueueMatcher::default()),
            policy: RecordingPolicy::default(),
            codec: Arc::new(JsonCodec),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Options described by a validated config
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.recording_path.clone())
            .key_strategy(config.matcher)
            .policy(
                config
                    .record
                    .clone()
                    .into_policy(config.not_recorded_throws_errors),
            )
    }

    /// Replace the matcher
    #[must_use]
    pub fn matcher(mut self, matcher: impl Matcher + 'static) -> Self {
        self.matcher = Arc::new(matcher);
        self
    }

    /// Use a queue matcher with the given key strategy
    #[must_use]
    pub fn key_strategy(self, strategy: impl KeyStrategy + 'static) -> Self {
        self.matcher(QueueMatcher::new(strategy))
    }

    /// Replace the recording predicate, keeping the refusal flag
    #[must_use]
    pub fn should_record<F>(mut self, should_record: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> bool + Send + Sync + 'static,
    {
        let throws = self.policy.not_recorded_throws_errors();
        self.policy = RecordingPolicy::new(should_record, throws);
        self
    }

    /// Set whether unrecorded requests fail instead of passing through
    #[must_use]
    pub fn not_recorded_throws_errors(mut self, throws: bool) -> Self {
        self.policy = self.policy.with_not_recorded_throws_errors(throws);
        self
    }

    /// Replace the whole recording policy
    #[must_use]
    pub fn policy(mut self, policy: RecordingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the cassette codec
    #[must_use]
    pub fn codec(mut self, codec: impl CassetteCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Replace the event observer
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Cassette storage location
    #[must_use]
    pub fn recording_path(&self) -> &Path {
        &self.recording_path
    }
}

impl fmt::Debug for VcrOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VcrOptions")
            .field("recording_path", &self.recording_path)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint;
    use crate::message::Body;
    use crate::policy::Disposition;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_parse() {
        let config_toml = r#"
            recording_path = "fixtures/api.json"
            matcher = "method_uri_body"
            not_recorded_throws_errors = true

            [record]
            hosts = ["api.example.com"]
            path_prefixes = ["/v1"]
        "#;

        let config: Config = toml::from_str(config_toml).unwrap();
        assert_eq!(config.matcher, KeyKind::MethodUriBody);
        assert!(config.not_recorded_throws_errors);
        assert!(config.record.enabled);
        assert_eq!(config.record.hosts, vec!["api.example.com"]);
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = toml::from_str(r#"recording_path = "c.json""#).unwrap();

        assert_eq!(config.matcher, KeyKind::MethodUri);
        assert!(!config.not_recorded_throws_errors);
        assert_eq!(config.record, RecordRule::default());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"recording_path = \"cassettes/run.json\"\nmatcher = \"fingerprint\"\n")
            .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.matcher, KeyKind::Fingerprint);
    }

    #[test]
    fn test_unknown_matcher_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"recording_path = \"c.json\"\nmatcher = \"fuzzy\"\n")
            .unwrap();

        assert!(matches!(
            Config::from_file(file.path()),
            Err(RewindError::ConfigError(_))
        ));
    }

    #[test]
    fn test_invalid_path_prefix() {
        let config: Config = toml::from_str(
            r#"
            recording_path = "c.json"
            [record]
            path_prefixes = ["v1"]
        "#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_directory_recording_path_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            recording_path: dir.path().to_path_buf(),
            matcher: KeyKind::default(),
            not_recorded_throws_errors: false,
            record: RecordRule::default(),
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_options_from_config() {
        let config: Config = toml::from_str(
            r#"
            recording_path = "c.json"
            not_recorded_throws_errors = true
            [record]
            enabled = false
        "#,
        )
        .unwrap();

        let options = VcrOptions::from_config(&config);
        let request = fingerprint::build("GET", "http://x.test/", &Body::Empty, &[]).unwrap();

        assert_eq!(options.recording_path(), Path::new("c.json"));
        assert_eq!(options.policy.decide(&request), Disposition::Refuse);
    }

    #[test]
    fn test_builder_keeps_flag_when_predicate_changes() {
        let options = VcrOptions::new("c.json")
            .not_recorded_throws_errors(true)
            .should_record(|_| false);
        let request = fingerprint::build("GET", "http://x.test/", &Body::Empty, &[]).unwrap();

        assert_eq!(options.policy.decide(&request), Disposition::Refuse);
    }
}
