//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.blocktime/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{LevelFilter, debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::DEFAULT_BASE_URL;
use crate::core::command::UnknownCommand;
use crate::core::keymap::{Keymap, Keymaps};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BlocktimeConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub keymap: KeymapConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
}

/// Chord → command-name overrides, one table per mode.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct KeymapConfig {
    #[serde(default)]
    pub normal: HashMap<String, String>,
    #[serde(default)]
    pub insert: HashMap<String, String>,
    #[serde(default)]
    pub visual: HashMap<String, String>,
    #[serde(default)]
    pub command: HashMap<String, String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub log_level: LevelFilter,
    pub base_url: String,
    pub auth_token: Option<String>,
    pub keymaps: Keymaps,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    /// A `[keymap.<mode>]` entry names a command that does not exist.
    Keymap { mode: &'static str, source: UnknownCommand },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::Keymap { mode, source } => {
                write!(f, "config parse error in [keymap.{mode}]: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.blocktime/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".blocktime").join("config.toml"))
}

/// Load config from `path`, or from `~/.blocktime/config.toml` when `None`.
///
/// If the default file doesn't exist, generates a commented-out default and
/// returns `BlocktimeConfig::default()`. An explicit path that doesn't exist
/// is an error. A malformed file returns `ConfigError::Parse`.
pub fn load_config(path: Option<&Path>) -> Result<BlocktimeConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_path() {
            Some(p) => {
                if !p.exists() {
                    info!("No config file found, generating default at {}", p.display());
                    generate_default_config(&p);
                    return Ok(BlocktimeConfig::default());
                }
                p
            }
            None => {
                warn!("Could not determine home directory, using default config");
                return Ok(BlocktimeConfig::default());
            }
        },
    };

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config = parse_config(&contents)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<BlocktimeConfig, ConfigError> {
    toml::from_str(contents).map_err(ConfigError::Parse)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# blocktime configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# log_level = "debug"                 # "off", "error", "warn", "info", "debug", "trace"

# [server]
# base_url = "http://localhost:3000/api"   # Or BLOCKTIME_BASE_URL / --base-url
# auth_token = "..."                        # Or BLOCKTIME_TOKEN

# Key overrides per mode: chord = "command_name". "none" removes a binding.
# Chords are built as Meta+Shift+Ctrl+Alt+<key>, e.g. "Ctrl+n", "Shift+Tab".

# [keymap.normal]
# "j" = "move_to_next_element"
# "k" = "move_to_previous_element"
# "q" = "none"

# [keymap.insert]
# "Ctrl+Enter" = "add_new_child_entry"
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_base_url` is from the `--base-url` flag (None = not specified).
pub fn resolve(config: &BlocktimeConfig, cli_base_url: Option<&str>) -> Result<ResolvedConfig, ConfigError> {
    // Base URL: CLI → env → config → default
    let base_url = cli_base_url
        .map(|s| s.to_string())
        .or_else(|| std::env::var("BLOCKTIME_BASE_URL").ok())
        .or_else(|| config.server.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    // Token: env → config
    let auth_token = std::env::var("BLOCKTIME_TOKEN")
        .ok()
        .or_else(|| config.server.auth_token.clone())
        .filter(|t| !t.is_empty());

    let log_level = match config.general.log_level.as_deref() {
        Some(level) => level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using {}", level, DEFAULT_LOG_LEVEL);
            DEFAULT_LOG_LEVEL
        }),
        None => DEFAULT_LOG_LEVEL,
    };

    Ok(ResolvedConfig {
        log_level,
        base_url,
        auth_token,
        keymaps: resolve_keymaps(&config.keymap)?,
    })
}

/// Built-in tables with the configured overrides merged on top.
fn resolve_keymaps(config: &KeymapConfig) -> Result<Keymaps, ConfigError> {
    let mut keymaps = Keymaps::default();
    let tables: [(&'static str, &mut Keymap, &HashMap<String, String>); 4] = [
        ("normal", &mut keymaps.normal, &config.normal),
        ("insert", &mut keymaps.insert, &config.insert),
        ("visual", &mut keymaps.visual, &config.visual),
        ("command", &mut keymaps.command, &config.command),
    ];
    for (mode, table, overrides) in tables {
        table
            .apply_overrides(overrides)
            .map_err(|source| ConfigError::Keymap { mode, source })?;
        if !overrides.is_empty() {
            debug!("Applied {} {} key override(s)", overrides.len(), mode);
        }
    }
    Ok(keymaps)
}
