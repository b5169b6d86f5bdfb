//! Layered settings: defaults, an optional file, then environment.
//!
//! Environment variables use the `GRAPHWATCH_` prefix and `__` between
//! nested keys, e.g. `GRAPHWATCH_POLLER__TIMEOUT=20m` or
//! `GRAPHWATCH_SERVER__PASSWORD=secret`.
//!
//! ```toml
//! [server]
//! endpoint = "https://anzo.example.com:8443"
//! username = "admin"
//!
//! [poller]
//! poll_interval = "5s"
//! timeout = "20m"
//!
//! [classifier]
//! failed_threshold = 3
//!
//! [classifier.categories]
//! storage-dependency = ["disk full", "no space left"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::classify::{CategoryKeywords, Classifier};
use crate::duration::deserialize_duration;
use crate::poller::PollerConfig;

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "GRAPHWATCH";

/// Error loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Settings loaded but are unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Connection settings for the management API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
    /// Accept self-signed certificates.
    pub accept_invalid_certs: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:8443".to_string(),
            username: None,
            password: None,
            request_timeout: Duration::from_secs(180),
            accept_invalid_certs: true,
        }
    }
}

/// Classification settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Failed-component count above which an online resource is Failed.
    pub failed_threshold: Option<usize>,
    /// Extra keywords merged into the default categories.
    pub categories: BTreeMap<String, Vec<String>>,
}

/// All settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub poller: PollerConfig,
    pub classifier: ClassifierSettings,
}

impl Settings {
    /// Load from an optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Load from an optional file and an explicit environment map.
    ///
    /// `None` reads the process environment.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(env),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the poller cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("server.endpoint is empty".to_string()));
        }
        if self.poller.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "poller.poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Classifier with the default categories plus any configured ones.
    pub fn classifier(&self) -> Classifier {
        let mut categories = CategoryKeywords::default();
        categories.extend(CategoryKeywords::from_map(self.classifier.categories.clone()));
        Classifier::new(categories).with_failed_threshold(self.classifier.failed_threshold)
    }

    /// HTTP client for the configured server.
    #[cfg(feature = "anzo")]
    pub fn status_client(
        &self,
    ) -> Result<graphwatch_adapters::anzo::GraphmartStatusClient, graphwatch_adapters::AdapterError>
    {
        let server = &self.server;
        graphwatch_adapters::anzo::GraphmartStatusClient::builder()
            .endpoint(server.endpoint.clone())
            .credentials(
                server.username.clone().unwrap_or_default(),
                server.password.clone().unwrap_or_default(),
            )
            .timeout(server.request_timeout)
            .accept_invalid_certs(server.accept_invalid_certs)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SEARCH_INDEX_DEPENDENCY;
    use std::io::Write;

    fn no_env() -> Option<config::Map<String, String>> {
        Some(config::Map::new())
    }

    #[test]
    fn defaults_without_sources() {
        let settings = Settings::load_with_env(None, no_env()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.server.endpoint, "https://localhost:8443");
        assert!(settings.server.accept_invalid_certs);
        assert_eq!(settings.poller.timeout, Duration::from_secs(1000));
    }

    #[test]
    fn load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
endpoint = "https://anzo.example.com:8443"
username = "admin"
request_timeout = "30s"

[poller]
poll_interval = "2s"
timeout = "20m"
failure_tolerance = 5

[classifier]
failed_threshold = 2

[classifier.categories]
storage-dependency = ["Disk Full"]
search-index-dependency = ["opensearch"]
"#
        )
        .unwrap();

        let settings = Settings::load_with_env(Some(file.path()), no_env()).unwrap();
        assert_eq!(settings.server.endpoint, "https://anzo.example.com:8443");
        assert_eq!(settings.server.username.as_deref(), Some("admin"));
        assert_eq!(settings.server.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.poller.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.poller.timeout, Duration::from_secs(1200));
        assert_eq!(settings.poller.failure_tolerance, 5);
        assert_eq!(settings.poller.retry_delay, Duration::from_secs(30));

        let classifier = settings.classifier();
        assert_eq!(classifier.failed_threshold(), Some(2));
        assert!(classifier
            .categories()
            .keywords("storage-dependency")
            .unwrap()
            .contains("disk full"));
        let search = classifier
            .categories()
            .keywords(SEARCH_INDEX_DEPENDENCY)
            .unwrap();
        assert!(search.contains("opensearch"));
        assert!(search.contains("elasticsearch"));
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[poller]\ntimeout = \"20m\"").unwrap();

        let mut env = config::Map::new();
        env.insert("GRAPHWATCH_POLLER__TIMEOUT".to_string(), "90s".to_string());
        env.insert("GRAPHWATCH_SERVER__PASSWORD".to_string(), "secret".to_string());

        let settings = Settings::load_with_env(Some(file.path()), Some(env)).unwrap();
        assert_eq!(settings.poller.timeout, Duration::from_secs(90));
        assert_eq!(settings.server.password.as_deref(), Some("secret"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = Settings::load_with_env(Some(Path::new("/nonexistent/graphwatch.toml")), no_env());
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn zero_interval_is_invalid() {
        let mut env = config::Map::new();
        env.insert("GRAPHWATCH_POLLER__POLL_INTERVAL".to_string(), "0s".to_string());
        let result = Settings::load_with_env(None, Some(env));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
