//! Configuration loading for dynalign.
//!
//! Kept free of the alignment crate so the values can be read, printed
//! and checked without pulling in MIDI handling.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dynaconf::DynaConfig;
//!
//! let config = DynaConfig::load().expect("Failed to load config");
//!
//! println!("Dataset: {}", config.paths.dataset_dir.display());
//! println!("Tolerance: {}", config.matching.tolerance);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/dynalign/config.toml` (system)
//! 2. `~/.config/dynalign/config.toml` (user)
//! 3. `./dynalign.toml` (local override, replaced by `--config`)
//! 4. Environment variables (`DYNALIGN_*`, `RUST_LOG`)
//!
//! Files are merged table by table, so a file only needs the keys it changes.
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! dataset_dir = "~/data/asap-dataset"
//! output_dir = "~/data/processed"
//!
//! [matching]
//! tolerance = 0.5
//! exclusive = false
//!
//! [gap_fill.velocity]
//! before = 3
//! after = 3
//! divisor = "mean"
//!
//! [gap_fill.length]
//! before = 2
//! after = 2
//! divisor = 4
//!
//! [batch]
//! workers = 0
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod paths;
pub mod tuning;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use paths::{BatchConfig, PathsConfig, TelemetryConfig};
pub use tuning::{DivisorName, DivisorSetting, GapFillConfig, MatchingConfig, WindowConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete dynalign configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DynaConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub gap_fill: GapFillConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl DynaConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/dynalign/config.toml`
    /// 3. `~/.config/dynalign/config.toml`
    /// 4. `./dynalign.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./dynalign.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and return information about sources.
    pub fn load_with_sources() -> Result<(Self, ConfigSources), ConfigError> {
        Self::load_with_sources_from(None)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = loader::defaults_table()?;
        let mut last_file = PathBuf::from("<defaults>");

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path.clone());
            last_file = path;
        }

        let mut config = loader::from_table(merged, &last_file)?;
        config.expand_paths();

        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    fn expand_paths(&mut self) {
        for path in [&mut self.paths.dataset_dir, &mut self.paths.output_dir] {
            if let Some(s) = path.to_str() {
                *path = loader::expand_path(s);
            }
        }
    }

    /// Reject values the aligner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerance = self.matching.tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "matching.tolerance must be a non-negative number, got {tolerance}"
            )));
        }

        for (name, window) in [
            ("velocity", &self.gap_fill.velocity),
            ("length", &self.gap_fill.length),
        ] {
            if let DivisorSetting::Fixed(d) = window.divisor {
                if !d.is_finite() || d <= 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "gap_fill.{name}.divisor must be \"mean\" or a positive number, got {d}"
                    )));
                }
            }
        }

        if self.paths.output_extension.is_empty() {
            return Err(ConfigError::Invalid(
                "paths.output_extension must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();

        output.push_str("# dynalign configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!(
            "dataset_dir = \"{}\"\n",
            self.paths.dataset_dir.display()
        ));
        output.push_str(&format!(
            "output_dir = \"{}\"\n",
            self.paths.output_dir.display()
        ));
        output.push_str(&format!(
            "metadata_file = \"{}\"\n",
            self.paths.metadata_file.display()
        ));
        output.push_str(&format!(
            "annotations_file = \"{}\"\n",
            self.paths.annotations_file.display()
        ));
        output.push_str(&format!(
            "output_extension = \"{}\"\n",
            self.paths.output_extension
        ));

        output.push_str("\n[matching]\n");
        output.push_str(&format!("tolerance = {:?}\n", self.matching.tolerance));
        output.push_str(&format!("exclusive = {}\n", self.matching.exclusive));

        for (name, window) in [
            ("velocity", &self.gap_fill.velocity),
            ("length", &self.gap_fill.length),
        ] {
            output.push_str(&format!("\n[gap_fill.{name}]\n"));
            output.push_str(&format!("before = {}\n", window.before));
            output.push_str(&format!("after = {}\n", window.after));
            output.push_str(&format!("divisor = {}\n", window.divisor));
        }

        output.push_str("\n[batch]\n");
        output.push_str(&format!("workers = {}\n", self.batch.workers));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = \"{}\"\n",
            self.telemetry.log_level
        ));

        output
    }
}
