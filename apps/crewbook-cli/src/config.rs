//! # Crewbook Configuration
//!
//! Settings for the reporting command line.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command line flags (highest priority, applied by the command)      │
//! │     --org acme --preset ytd                                            │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     CREWBOOK_ORG_ID=acme                                               │
//! │     CREWBOOK_DB_PATH=/srv/crewbook.db                                  │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/crewbook/crewbook.toml (Linux)                           │
//! │     ~/Library/Application Support/com.crewbook.crewbook/ (macOS)       │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! │     preset 6months, mode sentPaid, top_n 5                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # crewbook.toml
//! [org]
//! id = "acme-builders"
//!
//! [report]
//! preset = "ytd"        # last7 | thisMonth | ytd | 6months | 12months | all
//! mode = "sentPaid"     # sentPaid | paidOnly | includeDrafts
//! top_n = 5
//! export_dir = "./exports"
//!
//! [database]
//! path = "./crewbook.db"
//! max_connections = 5
//! ```

use crewbook_core::validation::{validate_org_id, validate_top_n};
use crewbook_core::{RangePreset, ReportMode, DEFAULT_TOP_N};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{CliError, CliResult};

// =============================================================================
// Sections
// =============================================================================

/// The organization every command works on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgConfig {
    /// Organization id. Required before any command runs.
    #[serde(default)]
    pub id: String,
}

/// Defaults for summaries and exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Range used when `--preset` is not given.
    #[serde(default)]
    pub preset: RangePreset,

    /// Which invoices reports include.
    #[serde(default)]
    pub mode: ReportMode,

    /// Entries per ranking (1-50).
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Directory CSV exports are written into.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            preset: RangePreset::default(),
            mode: ReportMode::default(),
            top_n: default_top_n(),
            export_dir: default_export_dir(),
        }
    }
}

/// Invoice database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Falls back to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrewbookConfig {
    #[serde(default)]
    pub org: OrgConfig,

    #[serde(default)]
    pub report: ReportSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl CrewbookConfig {
    /// Loads configuration from file and environment over defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (crewbook.toml)
    /// 3. Environment variables
    ///
    /// Validation is left to [`CrewbookConfig::validate`] so command line
    /// flags can fill in gaps first.
    pub fn load(config_path: Option<PathBuf>) -> CliResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parses a config file body.
    pub fn from_toml(contents: &str) -> CliResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CliResult<()> {
        if self.org.id.trim().is_empty() {
            return Err(CliError::InvalidConfig(
                "org id is not set (use --org, CREWBOOK_ORG_ID or [org] id)".into(),
            ));
        }
        validate_org_id(&self.org.id)?;
        validate_top_n(self.report.top_n)?;

        if self.report.preset == RangePreset::Custom {
            return Err(CliError::InvalidConfig(
                "custom cannot be the default preset; pass --from/--to instead".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(CliError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("CREWBOOK_ORG_ID") {
            debug!(org_id = %id, "Overriding org id from environment");
            self.org.id = id;
        }

        if let Ok(path) = std::env::var("CREWBOOK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(top_n) = std::env::var("CREWBOOK_TOP_N") {
            match top_n.parse::<usize>() {
                Ok(n) => self.report.top_n = n,
                Err(_) => warn!(value = %top_n, "Ignoring non-numeric CREWBOOK_TOP_N"),
            }
        }

        if let Ok(dir) = std::env::var("CREWBOOK_EXPORT_DIR") {
            self.report.export_dir = PathBuf::from(dir);
        }

        if let Ok(preset) = std::env::var("CREWBOOK_DEFAULT_PRESET") {
            match preset.parse() {
                Ok(parsed) => self.report.preset = parsed,
                Err(_) => warn!(preset = %preset, "Unknown preset in environment"),
            }
        }

        if let Ok(mode) = std::env::var("CREWBOOK_REPORT_MODE") {
            match mode.parse() {
                Ok(parsed) => self.report.mode = parsed,
                Err(_) => warn!(mode = %mode, "Unknown report mode in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "crewbook", "crewbook")
            .map(|dirs| dirs.config_dir().join("crewbook.toml"))
    }

    /// The SQLite file to open, creating the platform data directory when
    /// no explicit path is configured.
    pub fn database_path(&self) -> CliResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = directories::ProjectDirs::from("com", "crewbook", "crewbook").ok_or_else(|| {
            CliError::InvalidConfig("could not determine app data directory".into())
        })?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("crewbook.db"))
    }
}
