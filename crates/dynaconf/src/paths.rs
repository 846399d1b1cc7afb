//! Where data comes from and where tables go, plus process-level settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dataset and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the dataset; metadata and MIDI paths are relative to it.
    /// Default: ./asap-dataset
    #[serde(default = "PathsConfig::default_dataset_dir")]
    pub dataset_dir: PathBuf,

    /// Root of the mirrored output tree.
    /// Default: ./processed
    #[serde(default = "PathsConfig::default_output_dir")]
    pub output_dir: PathBuf,

    /// Metadata table, relative to `dataset_dir` unless absolute.
    /// Default: metadata.csv
    #[serde(default = "PathsConfig::default_metadata_file")]
    pub metadata_file: PathBuf,

    /// Annotation store, relative to `dataset_dir` unless absolute.
    /// Default: asap_annotations.json
    #[serde(default = "PathsConfig::default_annotations_file")]
    pub annotations_file: PathBuf,

    /// Extension given to written tables.
    /// Default: txt
    #[serde(default = "PathsConfig::default_output_extension")]
    pub output_extension: String,
}

impl PathsConfig {
    fn default_dataset_dir() -> PathBuf {
        PathBuf::from("asap-dataset")
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from("processed")
    }

    fn default_metadata_file() -> PathBuf {
        PathBuf::from("metadata.csv")
    }

    fn default_annotations_file() -> PathBuf {
        PathBuf::from("asap_annotations.json")
    }

    fn default_output_extension() -> String {
        "txt".to_string()
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset_dir: Self::default_dataset_dir(),
            output_dir: Self::default_output_dir(),
            metadata_file: Self::default_metadata_file(),
            annotations_file: Self::default_annotations_file(),
            output_extension: Self::default_output_extension(),
        }
    }
}

/// Batch execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Worker threads. 0 picks one per core.
    #[serde(default)]
    pub workers: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
