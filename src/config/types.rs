use std::path::Path;

use serde::Deserialize;

use crate::config::paths::default_config_path;
use crate::error::SpeedError;
use crate::net::downloader::DEFAULT_CHUNK_SIZE;
use crate::payload::encoder::QualitySearch;
use crate::transfer::log::DEFAULT_CAPACITY;
use crate::transfer::stats::DEFAULT_RECENT_WINDOW;

/// Verbosity level controlling tracing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (info level)
    Normal,
    /// Verbose output (debug level)
    Verbose,
    /// Maximum output (trace level)
    Trace,
}

impl From<(bool, u8)> for Verbosity {
    /// Convert from (quiet_flag, verbose_count) to Verbosity.
    ///
    /// - quiet=true -> Quiet (regardless of verbose count)
    /// - verbose=0  -> Normal
    /// - verbose=1  -> Verbose
    /// - verbose=2+ -> Trace
    fn from((quiet, verbose_count): (bool, u8)) -> Self {
        if quiet {
            Verbosity::Quiet
        } else {
            match verbose_count {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}

impl Verbosity {
    /// Return the tracing filter string for this verbosity level.
    pub fn as_tracing_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::Trace => "trace",
        }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self, Verbosity::Quiet)
    }
}

/// Settings for the `serve` command.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Maximum number of observations kept in the transfer log.
    pub history_capacity: usize,
    /// Number of observations reported as `recent_requests`.
    pub recent_window: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            history_capacity: DEFAULT_CAPACITY,
            recent_window: DEFAULT_RECENT_WINDOW,
        }
    }
}

/// Settings for payload generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Canvas size used when only a target size is requested.
    pub default_width: u32,
    pub default_height: u32,
    /// Upper bound on either canvas dimension.
    pub max_dimension: u32,
    /// JPEG quality for dimension-only requests.
    pub fixed_quality: u8,
    pub start_quality: u8,
    pub quality_step: u8,
    pub min_quality: u8,
    /// Accepted overshoot of the target, as a ratio (1.10 = 10% over).
    pub tolerance: f64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            default_width: 1920,
            default_height: 1080,
            max_dimension: 10_000,
            fixed_quality: 85,
            start_quality: 85,
            quality_step: 5,
            min_quality: 10,
            tolerance: 1.10,
        }
    }
}

impl EncoderConfig {
    pub fn search(&self) -> QualitySearch {
        QualitySearch {
            start_quality: self.start_quality,
            step: self.quality_step,
            min_quality: self.min_quality,
            tolerance: self.tolerance,
        }
    }
}

/// Settings for the `probe` command.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub default_url: String,
    pub timeout_secs: u64,
    /// Read size used while streaming the response body.
    pub chunk_size: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            default_url: "https://picsum.photos/1920/1080".to_string(),
            timeout_secs: 30,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Application configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub encoder: EncoderConfig,
    pub probe: ProbeConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used if present, otherwise defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SpeedError> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(SpeedError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        tracing::debug!(path = %path.display(), "Loading config");
        let contents = std::fs::read_to_string(&path)?;
        let config = Self::parse(&contents)?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn parse(contents: &str) -> Result<Self, SpeedError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SpeedError> {
        if self.server.history_capacity == 0 {
            return Err(SpeedError::Config(
                "server.history_capacity must be greater than 0".to_string(),
            ));
        }
        if self.probe.chunk_size == 0 {
            return Err(SpeedError::Config(
                "probe.chunk_size must be greater than 0".to_string(),
            ));
        }
        let encoder = &self.encoder;
        if encoder.default_width == 0 || encoder.default_height == 0 {
            return Err(SpeedError::Config(
                "encoder.default_width and encoder.default_height must be greater than 0"
                    .to_string(),
            ));
        }
        if encoder.default_width > encoder.max_dimension
            || encoder.default_height > encoder.max_dimension
        {
            return Err(SpeedError::Config(format!(
                "default canvas {}x{} exceeds encoder.max_dimension ({})",
                encoder.default_width, encoder.default_height, encoder.max_dimension
            )));
        }
        if !(1..=100).contains(&self.encoder.fixed_quality) {
            return Err(SpeedError::Config(
                "encoder.fixed_quality must be between 1 and 100".to_string(),
            ));
        }
        self.encoder.search().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from((true, 2)), Verbosity::Quiet);
        assert_eq!(Verbosity::from((false, 0)), Verbosity::Normal);
        assert_eq!(Verbosity::from((false, 1)), Verbosity::Verbose);
        assert_eq!(Verbosity::from((false, 5)), Verbosity::Trace);
        assert_eq!(Verbosity::Quiet.as_tracing_filter(), "error");
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.history_capacity, 100);
        assert_eq!(config.server.recent_window, 10);
        assert_eq!(config.encoder.fixed_quality, 85);
        assert_eq!(config.encoder.quality_step, 5);
        assert_eq!(config.encoder.min_quality, 10);
        assert_eq!(config.probe.timeout_secs, 30);
        assert_eq!(config.probe.chunk_size, 8192);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::parse(
            "[server]\nport = 8080\n\n[encoder]\ntolerance = 1.25\n",
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.encoder.tolerance, 1.25);
        assert_eq!(config.encoder.start_quality, 85);
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = AppConfig::parse("[server]\nhistory_capacity = 0\n").unwrap_err();
        assert!(matches!(err, SpeedError::Config(_)));
    }

    #[test]
    fn default_canvas_must_fit_max_dimension() {
        let err = AppConfig::parse("[encoder]\nmax_dimension = 1000\n").unwrap_err();
        match err {
            SpeedError::Config(msg) => assert!(msg.contains("1920x1080")),
            other => panic!("Expected Config variant, got: {:?}", other),
        }

        let config = AppConfig::parse(
            "[encoder]\nmax_dimension = 1000\ndefault_width = 800\ndefault_height = 600\n",
        )
        .unwrap();
        assert_eq!(config.encoder.default_width, 800);
    }

    #[test]
    fn zero_default_canvas_rejected() {
        let err = AppConfig::parse("[encoder]\ndefault_height = 0\n").unwrap_err();
        assert!(matches!(err, SpeedError::Config(_)));
    }

    #[test]
    fn bad_search_rejected() {
        let err = AppConfig::parse("[encoder]\nquality_step = 0\n").unwrap_err();
        assert!(matches!(err, SpeedError::Config(_)));
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(format!("{}", err).contains("Config file not found"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[probe]\ntimeout_secs = 5\n").unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.probe.timeout_secs, 5);
    }
}
