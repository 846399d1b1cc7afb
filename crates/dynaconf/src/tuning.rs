//! Alignment tuning: matching tolerance and gap-fill windows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pitch matcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Largest onset distance (score seconds) accepted for a match.
    /// Default: 0.5
    #[serde(default = "MatchingConfig::default_tolerance")]
    pub tolerance: f64,

    /// Let each performance note satisfy at most one score note.
    /// Default: false
    #[serde(default)]
    pub exclusive: bool,
}

impl MatchingConfig {
    fn default_tolerance() -> f64 {
        0.5
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            tolerance: Self::default_tolerance(),
            exclusive: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivisorName {
    Mean,
}

/// `divisor = "mean"` or `divisor = 4`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DivisorSetting {
    Named(DivisorName),
    Fixed(f64),
}

impl fmt::Display for DivisorSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivisorSetting::Named(DivisorName::Mean) => f.write_str("\"mean\""),
            DivisorSetting::Fixed(d) => write!(f, "{d:?}"),
        }
    }
}

/// Neighbour window around a missing note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub before: usize,
    pub after: usize,
    pub divisor: DivisorSetting,
}

impl WindowConfig {
    fn velocity() -> Self {
        Self {
            before: 3,
            after: 3,
            divisor: DivisorSetting::Named(DivisorName::Mean),
        }
    }

    fn length() -> Self {
        Self {
            before: 2,
            after: 2,
            divisor: DivisorSetting::Fixed(4.0),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::velocity()
    }
}

/// Gap filler windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapFillConfig {
    /// Default: 3 before, 3 after, mean.
    #[serde(default = "WindowConfig::velocity")]
    pub velocity: WindowConfig,

    /// Default: 2 before, 2 after, divided by 4.
    #[serde(default = "WindowConfig::length")]
    pub length: WindowConfig,
}

impl Default for GapFillConfig {
    fn default() -> Self {
        Self {
            velocity: WindowConfig::velocity(),
            length: WindowConfig::length(),
        }
    }
}
