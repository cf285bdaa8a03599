//! Configuration for the Astra code index.
//!
//! Settings are layered in this order, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. Environment variables prefixed with `ASTRA_`, using `__` between
//!    section and key (e.g. `ASTRA_INDEX__MAX_FILE_SIZE=2048`)

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ASTRA";

/// Default upper bound on indexed file size (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 1024 * 1024;

/// Default backward scan window for enclosing-function lookups.
pub const DEFAULT_ENCLOSING_WINDOW: usize = 100;

/// Errors found while validating a loaded configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid exclude pattern '{pattern}': {message}")]
    InvalidExcludePattern { pattern: String, message: String },

    #[error("min_citation_ratio must be within 0.0..=1.0, got {0}")]
    CitationRatioOutOfRange(f64),

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AstraConfig {
    /// Index build and search settings
    pub index: IndexConfig,
    /// Response validation settings
    pub validator: ValidatorConfig,
}

/// Build options shared by the codebase index and the grep index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Files larger than this many bytes are skipped
    pub max_file_size: usize,
    /// Default cap on search results
    pub max_results: usize,
    /// Lines of context before/after each match
    pub context_lines: usize,
    /// Pre-build the call-site index
    pub build_call_index: bool,
    /// Regex patterns; matching paths are skipped
    pub exclude_patterns: Vec<String>,
    /// Lines scanned backward when looking for an enclosing function
    pub enclosing_window: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_results: 100,
            context_lines: 2,
            build_call_index: true,
            exclude_patterns: vec![
                "node_modules/".to_string(),
                r"\.git/".to_string(),
                "target/".to_string(),
                "dist/".to_string(),
                "build/".to_string(),
            ],
            enclosing_window: DEFAULT_ENCLOSING_WINDOW,
        }
    }
}

impl IndexConfig {
    /// Compile the exclude patterns.
    pub fn compiled_excludes(&self) -> Result<Vec<Regex>, ConfigError> {
        self.exclude_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

/// Settings for scoring generated answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Treat any unknown reference or a low citation ratio as invalid
    pub strict_mode: bool,
    /// Minimum grounding matches per non-empty response line
    pub min_citation_ratio: f64,
    /// Hedging matches tolerated when nothing is cited
    pub max_hallucination_score: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            min_citation_ratio: 0.0,
            max_hallucination_score: 3,
        }
    }
}

impl AstraConfig {
    /// Load from defaults, an optional TOML file, and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&AstraConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("index.exclude_patterns"),
        );

        let config: AstraConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Parse an inline TOML document; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: AstraConfig = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and compile patterns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index.max_results == 0 {
            return Err(ConfigError::ZeroLimit("index.max_results"));
        }
        if self.index.max_file_size == 0 {
            return Err(ConfigError::ZeroLimit("index.max_file_size"));
        }
        if !(0.0..=1.0).contains(&self.validator.min_citation_ratio) {
            return Err(ConfigError::CitationRatioOutOfRange(
                self.validator.min_citation_ratio,
            ));
        }
        self.index.compiled_excludes()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AstraConfig::default();
        assert_eq!(config.index.max_file_size, 1024 * 1024);
        assert_eq!(config.index.max_results, 100);
        assert_eq!(config.index.context_lines, 2);
        assert!(config.index.build_call_index);
        assert_eq!(config.index.enclosing_window, 100);
        assert!(!config.validator.strict_mode);
        assert_eq!(config.validator.max_hallucination_score, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = AstraConfig::from_toml_str(
            r#"
[index]
max_results = 25
exclude_patterns = ["vendor/"]

[validator]
strict_mode = true
"#,
        )
        .unwrap();

        assert_eq!(config.index.max_results, 25);
        assert_eq!(config.index.exclude_patterns, vec!["vendor/".to_string()]);
        assert_eq!(config.index.context_lines, 2);
        assert!(config.validator.strict_mode);
        assert_eq!(config.validator.max_hallucination_score, 3);
    }

    #[test]
    fn test_invalid_exclude_pattern_rejected() {
        let err = AstraConfig::from_toml_str("[index]\nexclude_patterns = [\"(\"]\n").unwrap_err();
        assert!(err.to_string().contains("Invalid exclude pattern"));
    }

    #[test]
    fn test_ratio_out_of_range_rejected() {
        let mut config = AstraConfig::default();
        config.validator.min_citation_ratio = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CitationRatioOutOfRange(_))
        ));
    }

    #[test]
    fn test_zero_max_results_rejected() {
        let mut config = AstraConfig::default();
        config.index.max_results = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroLimit(_))));
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[index]\ncontext_lines = 5\nbuild_call_index = false").unwrap();

        let config = AstraConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.index.context_lines, 5);
        assert!(!config.index.build_call_index);
        assert_eq!(config.index.max_results, 100);
    }

    #[test]
    #[serial]
    fn test_load_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[index]\nmax_file_size = 4096").unwrap();

        std::env::set_var("ASTRA_INDEX__MAX_FILE_SIZE", "2048");
        let config = AstraConfig::load(Some(file.path()));
        std::env::remove_var("ASTRA_INDEX__MAX_FILE_SIZE");

        assert_eq!(config.unwrap().index.max_file_size, 2048);
    }

    #[test]
    #[serial]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AstraConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = AstraConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AstraConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
