//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, DynaConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided it replaces the local override, and it is
/// returned even when missing so that loading reports the bad path.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/dynalign/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("dynalign/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("dynalign.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file as a raw table, checking it deserializes on its own.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    let parse_err = |e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let table: toml::Table = contents.parse().map_err(parse_err)?;
    // Catch type errors here so they carry the offending file's path
    toml::Value::Table(table.clone())
        .try_into::<DynaConfig>()
        .map_err(parse_err)?;
    Ok(table)
}

/// Load a single config file on top of the compiled defaults.
pub fn load_from_file(path: &Path) -> Result<DynaConfig, ConfigError> {
    let table = load_table(path)?;
    let mut merged = defaults_table()?;
    merge_tables(&mut merged, table);
    from_table(merged, path)
}

/// Compiled defaults as a TOML table, the base every file merges onto.
pub fn defaults_table() -> Result<toml::Table, ConfigError> {
    match toml::Value::try_from(DynaConfig::default()) {
        Ok(toml::Value::Table(table)) => Ok(table),
        Ok(other) => Err(ConfigError::Invalid(format!(
            "defaults rendered as {} instead of a table",
            other.type_str()
        ))),
        Err(e) => Err(ConfigError::Invalid(e.to_string())),
    }
}

pub(crate) fn from_table(table: toml::Table, path: &Path) -> Result<DynaConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Deep-merge `overlay` into `base`. Nested tables merge key by key;
/// any other value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                merge_tables(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut DynaConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides read through `lookup`. Unparseable numbers and
/// booleans are ignored.
pub fn apply_overrides_from(
    config: &mut DynaConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let mut record = |key: &str| sources.env_overrides.push(key.to_string());

    // Paths
    if let Some(v) = lookup("DYNALIGN_DATASET_DIR") {
        config.paths.dataset_dir = expand_path(&v);
        record("DYNALIGN_DATASET_DIR");
    }
    if let Some(v) = lookup("DYNALIGN_OUTPUT_DIR") {
        config.paths.output_dir = expand_path(&v);
        record("DYNALIGN_OUTPUT_DIR");
    }

    // Matching
    if let Some(tolerance) = lookup("DYNALIGN_TOLERANCE").and_then(|v| v.parse().ok()) {
        config.matching.tolerance = tolerance;
        record("DYNALIGN_TOLERANCE");
    }
    if let Some(exclusive) = lookup("DYNALIGN_EXCLUSIVE").and_then(|v| parse_bool(&v)) {
        config.matching.exclusive = exclusive;
        record("DYNALIGN_EXCLUSIVE");
    }

    // Batch
    if let Some(workers) = lookup("DYNALIGN_WORKERS").and_then(|v| v.parse().ok()) {
        config.batch.workers = workers;
        record("DYNALIGN_WORKERS");
    }

    // Telemetry
    if let Some(v) = lookup("DYNALIGN_LOG_LEVEL") {
        config.telemetry.log_level = v;
        record("DYNALIGN_LOG_LEVEL");
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        record("RUST_LOG");
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
