//! Configuration for geopulse paths and pipeline defaults.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (GEOPULSE_HOME, GEOPULSE_DATA)
//! 2. Config file (.geopulse/config.yaml)
//! 3. Defaults (~/.geopulse)
//!
//! Config file discovery:
//! - Searches current directory and parents for .geopulse/config.yaml
//! - Paths in config file are relative to the config file's parent directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::pipeline::{TOP_PAIRS, WEEKS_HISTORY};

/// File name of the published payload inside the data directory.
pub const PAYLOAD_FILE: &str = "pulse_data.json";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub pipeline: Option<PipelineConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to config file)
    pub home: Option<String>,
    /// Data directory holding the published payload (relative to config file)
    pub data: Option<String>,
    /// CAMEO country-name table (relative to config file)
    pub countries: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub top_pairs: Option<usize>,
    pub weeks_history: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to geopulse home (state)
    pub home: PathBuf,
    /// Absolute path to the data directory
    pub data: PathBuf,
    /// Country-name table, if configured
    pub countries: Option<PathBuf>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Pipeline settings
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub top_pairs: usize,
    pub weeks_history: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_pairs: TOP_PAIRS,
            weeks_history: WEEKS_HISTORY,
        }
    }
}

impl ResolvedConfig {
    /// Path of the published payload inside the data directory.
    pub fn payload_path(&self) -> PathBuf {
        self.data.join(PAYLOAD_FILE)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".geopulse").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    // Default home directory
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".geopulse");

    // Check for config file
    let config_file = find_config_file();

    let (home, data, countries, pipeline) = if let Some(ref config_path) = config_file {
        // Config file found - use it as base
        let config = load_config_file(config_path)?;

        // Base directory is the parent of .geopulse/ (i.e., grandparent of config.yaml)
        let base_dir = config_path
            .parent() // .geopulse/
            .and_then(|p| p.parent()) // project root
            .unwrap_or(Path::new("."));

        // Resolve home path
        let home = if let Ok(env_home) = std::env::var("GEOPULSE_HOME") {
            PathBuf::from(env_home)
        } else if let Some(ref home_path) = config.paths.home {
            // home is relative to .geopulse/ directory
            let geopulse_dir = config_path.parent().unwrap_or(Path::new("."));
            resolve_path(geopulse_dir, home_path)
        } else {
            default_home.clone()
        };

        // Resolve data path
        let data = if let Ok(env_data) = std::env::var("GEOPULSE_DATA") {
            PathBuf::from(env_data)
        } else if let Some(ref data_path) = config.paths.data {
            resolve_path(base_dir, data_path)
        } else {
            home.join("data")
        };

        // Country table is optional
        let countries = config
            .paths
            .countries
            .as_ref()
            .map(|p| resolve_path(base_dir, p));

        // Pipeline settings
        let pipeline = PipelineSettings {
            top_pairs: config
                .pipeline
                .as_ref()
                .and_then(|p| p.top_pairs)
                .unwrap_or(TOP_PAIRS),
            weeks_history: config
                .pipeline
                .as_ref()
                .and_then(|p| p.weeks_history)
                .unwrap_or(WEEKS_HISTORY),
        };

        (home, data, countries, pipeline)
    } else {
        // No config file - use env vars or defaults
        let home = std::env::var("GEOPULSE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_home.clone());

        let data = std::env::var("GEOPULSE_DATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join("data"));

        (home, data, None, PipelineSettings::default())
    };

    Ok(ResolvedConfig {
        home,
        data,
        countries,
        config_file,
        pipeline,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Get the geopulse home directory (state).
pub fn geopulse_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

/// Get the data directory holding the published payload.
pub fn data_dir() -> Result<PathBuf> {
    Ok(config()?.data.clone())
}

/// Get the payload path ($GEOPULSE_DATA/pulse_data.json)
pub fn payload_path() -> Result<PathBuf> {
    Ok(config()?.payload_path())
}

/// Get the configured country-name table, if any.
pub fn countries_path() -> Result<Option<PathBuf>> {
    Ok(config()?.countries.clone())
}
