//! Tool configuration.
//!
//! Handles loading, validating, and merging the optional `obset-products.toml`.
//! Stock defaults are the base layer; a user file overrides only the keys it
//! names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [manifest]
//! delimiter = ","                      # Column delimiter of poller manifests
//!
//! [products]
//! filetype_detection = "every-detector" # or "skip-first-detector"
//!
//! [processing]
//! max_processes = 4                    # Max parallel manifests (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::filters::FILTER_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "obset-products.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// How poller manifests are read.
    pub manifest: ManifestConfig,
    /// How the product tree is interpreted.
    pub products: ProductsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let delimiter = self.manifest.delimiter;
        if !delimiter.is_ascii() || delimiter.is_ascii_alphanumeric() {
            return Err(ConfigError::Validation(format!(
                "manifest.delimiter must be an ASCII punctuation or whitespace character, got {delimiter:?}"
            )));
        }
        if delimiter == FILTER_SEPARATOR {
            return Err(ConfigError::Validation(format!(
                "manifest.delimiter cannot be {FILTER_SEPARATOR:?}, which separates filter wheel positions"
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
    pub delimiter: char,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl ManifestConfig {
    /// The delimiter as the single byte the csv reader expects.
    ///
    /// Validation guarantees the delimiter is ASCII.
    pub fn delimiter_byte(&self) -> u8 {
        let mut buf = [0u8; 4];
        self.delimiter.encode_utf8(&mut buf);
        buf[0]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductsConfig {
    pub filetype_detection: FiletypeDetection,
}

/// When the drizzled filetype (`drz`/`drc`) is detected from exposure names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FiletypeDetection {
    /// On the first exposure of every detector.
    #[default]
    EveryDetector,
    /// On the first exposure of every detector but the first, which keeps a
    /// blank filetype.
    SkipFirstDetector,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of manifests processed at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Config::default())
        .map_err(|e| ConfigError::Validation(format!("default config does not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from an explicit file path.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(overlay))
}

/// Load `obset-products.toml` from `dir` if present, stock defaults otherwise.
pub fn load_config_in(dir: &Path) -> Result<Config, ConfigError> {
    let path = dir.join(DEFAULT_CONFIG_FILE);
    if path.exists() {
        load_config(&path)
    } else {
        resolve_config(None)
    }
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# obset-products configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Poller manifest input
# ---------------------------------------------------------------------------
[manifest]
# Column delimiter. Manifests are header-less with 8 columns:
# filename, proposal_id, program_id, obset_id, exptime, filters, detector, path
delimiter = ","

# ---------------------------------------------------------------------------
# Product tree interpretation
# ---------------------------------------------------------------------------
[products]
# When to detect the drizzled filetype (flt inputs -> drz, flc inputs -> drc):
#   "every-detector"      - on the first exposure of each detector
#   "skip-first-detector" - as above, but the first detector's products keep
#                           an empty filetype field
filetype_detection = "every-detector"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of manifests processed in parallel.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4
"##
}
