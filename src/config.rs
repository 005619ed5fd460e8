//! Layered `nbtree` settings read from TOML files and command-line flags.
//!
//! Highest priority first; a set value hides every layer below it:
//! 1. CLI flags (`--config`, `--no-confirm`, `--log-file`)
//! 2. `$NBTREE_CONFIG` environment variable (path to config file)
//! 3. Project-local `.nbtree.toml` in the current working directory
//! 4. Global `~/.config/nbtree/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::Deserialize;

use crate::tree::SortBy;

// ── Section configs ──────────────────────────────────────────────────────────

/// Confirmation prompts.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Ask before moving a folder to the recycle bin.
    pub confirm_delete: Option<bool>,
    /// Ask before reloading a folder or notebook from disk.
    pub confirm_reload: Option<bool>,
}

/// Quick navigation keys.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NavigationConfig {
    /// Prefix shown on every jump label of the folder tree.
    pub major_key: Option<String>,
    /// Key that shows the jump labels.
    pub trigger_key: Option<String>,
}

/// Tree panel settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Sort order used by the sort action: "name", "name_desc".
    pub sort_by: Option<String>,
}

/// Log file settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// "off", "error", "warn", "info", "debug" or "trace".
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// A notebook to open at startup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NotebookConfig {
    pub name: Option<String>,
    pub path: String,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Every section is optional so that layers can be stacked with [`AppConfig::merge`].
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub navigation: NavigationConfig,
    pub tree: TreeConfig,
    pub log: LogConfig,
    pub notebooks: Option<Vec<NotebookConfig>>,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default prefix of the jump labels.
pub const DEFAULT_MAJOR_KEY: char = 'd';
/// Default key that shows the jump labels.
pub const DEFAULT_TRIGGER_KEY: char = ';';

// ── Config file locator ──────────────────────────────────────────────────────

/// Config files to look for, highest priority first.
///
/// Does NOT include the CLI `--config` path; that one is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("NBTREE_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".nbtree.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("nbtree").join("config.toml"));
    }

    paths
}

/// Parse one config file. A missing file is `None`; a broken one is reported
/// on stderr, since logging starts only after the config is known.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

fn first_char(value: Option<&str>, default: char) -> char {
    value
        .and_then(|s| s.chars().next())
        .unwrap_or(default)
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                confirm_delete: other.general.confirm_delete.or(self.general.confirm_delete),
                confirm_reload: other.general.confirm_reload.or(self.general.confirm_reload),
            },
            navigation: NavigationConfig {
                major_key: other
                    .navigation
                    .major_key
                    .clone()
                    .or(self.navigation.major_key),
                trigger_key: other
                    .navigation
                    .trigger_key
                    .clone()
                    .or(self.navigation.trigger_key),
            },
            tree: TreeConfig {
                sort_by: other.tree.sort_by.clone().or(self.tree.sort_by),
            },
            log: LogConfig {
                level: other.log.level.clone().or(self.log.level),
                file: other.log.file.clone().or(self.log.file),
            },
            notebooks: other.notebooks.clone().or(self.notebooks),
        }
    }

    /// Stack every config layer.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Lowest priority first so that later files overwrite.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    /// Ask before moving a folder to the recycle bin.
    pub fn confirm_delete(&self) -> bool {
        self.general.confirm_delete.unwrap_or(true)
    }

    /// Whether to confirm before reload.
    pub fn confirm_reload(&self) -> bool {
        self.general.confirm_reload.unwrap_or(true)
    }

    pub fn major_key(&self) -> char {
        first_char(self.navigation.major_key.as_deref(), DEFAULT_MAJOR_KEY)
    }

    pub fn trigger_key(&self) -> char {
        first_char(self.navigation.trigger_key.as_deref(), DEFAULT_TRIGGER_KEY)
    }

    /// Sort order for the sort action.
    pub fn sort_by(&self) -> SortBy {
        SortBy::from_str(self.tree.sort_by.as_deref().unwrap_or("name"))
    }

    /// Log level; unknown names fall back to `info`.
    pub fn log_level(&self) -> LevelFilter {
        self.log
            .level
            .as_deref()
            .and_then(|l| l.parse().ok())
            .unwrap_or(LevelFilter::Info)
    }

    /// Log file path, defaulting to `<cache dir>/nbtree/nbtree.log`.
    pub fn log_file(&self) -> PathBuf {
        match &self.log.file {
            Some(file) => PathBuf::from(file),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("nbtree")
                .join("nbtree.log"),
        }
    }

    /// Notebooks listed in the config files.
    pub fn notebooks(&self) -> &[NotebookConfig] {
        self.notebooks.as_deref().unwrap_or(&[])
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
