//! Server configuration loaded from TOML and overlaid with environment variables.

use std::env;
use std::fs;
use std::io::Error as IoError;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use toml::de::Error as TomlError;
use tracklane_core::{Providers, service::DEFAULT_BATCH_CONCURRENCY};

#[derive(thiserror::Error, Debug)]
/// Errors raised while reading a configuration file.
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: IoError,
    },
    /// The file is not valid TOML of the expected shape.
    #[error("Invalid config: {0}")]
    Parse(#[from] TomlError),
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Complete server configuration. Every field has a default, so an empty
/// file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener settings.
    pub server: ListenConfig,
    /// Log subscriber settings.
    pub logging: LoggingConfig,
    /// Aggregator settings.
    pub tracking: TrackingConfig,
    /// Per-provider settings.
    pub providers: ProvidersConfig,
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `tracklane_core=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// `[tracking]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Provider attempt order.
    pub order: Vec<String>,
    /// Request timeout applied to every network provider.
    pub timeout_ms: u64,
    /// Lookups in flight per batch request.
    pub batch_concurrency: usize,
    /// Largest accepted batch.
    pub max_batch_size: usize,
}

/// `[providers.*]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Offline dataset.
    pub mock: MockConfig,
    /// Maersk track and trace.
    pub maersk: MaerskConfig,
    /// ShipsGo container tracking.
    pub shipsgo: ShipsGoConfig,
    /// TrackingMore multi-carrier tracking.
    pub trackingmore: TrackingMoreConfig,
}

/// `[providers.mock]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Whether the offline dataset answers lookups.
    pub enabled: bool,
    /// Extra records merged over the built-in dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<PathBuf>,
}

/// `[providers.maersk]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaerskConfig {
    /// API consumer key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_key: Option<String>,
    /// API host override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Timeout override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// `[providers.shipsgo]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipsGoConfig {
    /// Account auth code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    /// API root override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Timeout override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// `[providers.trackingmore]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingMoreConfig {
    /// API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// API host override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Timeout override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            order: Providers::ALL.iter().map(ToString::to_string).collect(),
            timeout_ms: 10_000,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            max_batch_size: 100,
        }
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dataset: None,
        }
    }
}

impl ServerConfig {
    /// Read a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is malformed.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Overlay process environment variables; env values take precedence.
    /// Returns the names of variables whose values were ignored as invalid.
    pub fn merge_env(&mut self) -> Vec<&'static str> {
        self.merge_from(|key| env::var(key).ok())
    }

    /// Overlay variables from `lookup`, see [`ServerConfig::merge_env`].
    pub fn merge_from<F>(&mut self, lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut ignored = Vec::new();

        if let Some(val) = lookup("TRACKLANE_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("TRACKLANE_PORT") {
            match val.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => ignored.push("TRACKLANE_PORT"),
            }
        }

        if let Some(val) = lookup("TRACKLANE_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("TRACKLANE_LOG_FORMAT") {
            match val.trim().to_lowercase().as_str() {
                "text" => self.logging.format = LogFormat::Text,
                "json" => self.logging.format = LogFormat::Json,
                _ => ignored.push("TRACKLANE_LOG_FORMAT"),
            }
        }

        if let Some(val) = lookup("TRACKLANE_TIMEOUT_MS") {
            match val.trim().parse() {
                Ok(timeout_ms) => self.tracking.timeout_ms = timeout_ms,
                Err(_) => ignored.push("TRACKLANE_TIMEOUT_MS"),
            }
        }
        if let Some(val) = lookup("TRACKLANE_PROVIDER_ORDER") {
            self.tracking.order = val
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
                .collect();
        }

        if let Some(val) = lookup("TRACKLANE_MOCK_ENABLED") {
            match val.trim().parse() {
                Ok(enabled) => self.providers.mock.enabled = enabled,
                Err(_) => ignored.push("TRACKLANE_MOCK_ENABLED"),
            }
        }
        if let Some(val) = lookup("TRACKLANE_MOCK_DATASET") {
            self.providers.mock.dataset = Some(PathBuf::from(val));
        }

        // Provider credentials (no TRACKLANE_ prefix for these)
        if let Some(val) = lookup("MAERSK_CONSUMER_KEY") {
            self.providers.maersk.consumer_key = Some(val);
        }
        if let Some(val) = lookup("SHIPSGO_AUTH_CODE") {
            self.providers.shipsgo.auth_code = Some(val);
        }
        if let Some(val) = lookup("TRACKINGMORE_API_KEY") {
            self.providers.trackingmore.api_key = Some(val);
        }

        ignored
    }

    /// Default provider request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.tracking.timeout_ms)
    }

    /// Provider request timeout, honouring a per-provider override.
    #[must_use]
    pub fn provider_timeout(&self, override_ms: Option<u64>) -> Duration {
        override_ms.map_or_else(|| self.timeout(), Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, val)| ((*key).to_owned(), (*val).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = ServerConfig::from_toml_str("").expect("empty config");

        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.tracking.order, ["mock", "maersk", "shipsgo", "trackingmore"]);
        assert_eq!(config.tracking.max_batch_size, 100);
        assert!(config.providers.mock.enabled, "mock is on by default");
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn sections_are_parsed() {
        let config = ServerConfig::from_toml_str(
            r#"
            [server]
            port = 9000

            [logging]
            format = "json"

            [tracking]
            order = ["maersk", "mock"]
            timeout_ms = 2500

            [providers.mock]
            enabled = false

            [providers.maersk]
            consumer_key = "abc"
            timeout_ms = 4000
            "#,
        )
        .expect("config");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.tracking.order, ["maersk", "mock"]);
        assert!(!config.providers.mock.enabled, "disabled in file");
        assert_eq!(config.providers.maersk.consumer_key.as_deref(), Some("abc"));
        assert_eq!(
            config.provider_timeout(config.providers.maersk.timeout_ms),
            Duration::from_millis(4000)
        );
        assert_eq!(
            config.provider_timeout(config.providers.shipsgo.timeout_ms),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn environment_takes_precedence() {
        let mut config = ServerConfig::from_toml_str(
            r#"
            [server]
            port = 9000
            [providers.shipsgo]
            auth_code = "from-file"
            "#,
        )
        .expect("config");

        let ignored = config.merge_from(lookup(&[
            ("TRACKLANE_PORT", "7070"),
            ("TRACKLANE_LOG_FORMAT", "JSON"),
            ("TRACKLANE_PROVIDER_ORDER", "trackingmore, mock,"),
            ("TRACKLANE_MOCK_ENABLED", "false"),
            ("SHIPSGO_AUTH_CODE", "from-env"),
            ("TRACKINGMORE_API_KEY", "tm"),
        ]));

        assert!(ignored.is_empty(), "all values valid: {ignored:?}");
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.tracking.order, ["trackingmore", "mock"]);
        assert!(!config.providers.mock.enabled, "disabled from env");
        assert_eq!(config.providers.shipsgo.auth_code.as_deref(), Some("from-env"));
        assert_eq!(config.providers.trackingmore.api_key.as_deref(), Some("tm"));
    }

    #[test]
    fn invalid_values_are_reported_and_ignored() {
        let mut config = ServerConfig::default();

        let ignored = config.merge_from(lookup(&[
            ("TRACKLANE_PORT", "eighty"),
            ("TRACKLANE_TIMEOUT_MS", "-1"),
            ("TRACKLANE_LOG_FORMAT", "xml"),
        ]));

        assert_eq!(
            ignored,
            ["TRACKLANE_PORT", "TRACKLANE_LOG_FORMAT", "TRACKLANE_TIMEOUT_MS"]
        );
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[tracking]\nbatch_concurrency = 8").expect("write config");

        let config = ServerConfig::from_file(file.path()).expect("config");

        assert_eq!(config.tracking.batch_concurrency, 8);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ServerConfig::from_file(Path::new("/nonexistent/tracklane.toml"))
            .expect_err("missing file");

        assert!(matches!(err, ConfigError::Io { .. }), "got {err}");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let err = ServerConfig::from_toml_str("[server\nport = ").expect_err("malformed");

        assert!(matches!(err, ConfigError::Parse(_)), "got {err}");
    }
}
