//! User configuration.
//!
//! Settings come from, lowest to highest precedence: built-in defaults, the
//! config file (`$XDG_CONFIG_HOME/formula/config.toml`), environment
//! variables, and command-line flags. The last two are handled by the CLI
//! and applied with [`Config::apply_overrides`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    prefix: Option<PathBuf>,
    formula_path: Option<PathBuf>,
    build_dir: Option<PathBuf>,
}

impl ConfigToml {
    fn merge(&mut self, other: ConfigToml) {
        if other.prefix.is_some() {
            self.prefix = other.prefix;
        }
        if other.formula_path.is_some() {
            self.formula_path = other.formula_path;
        }
        if other.build_dir.is_some() {
            self.build_dir = other.build_dir;
        }
    }
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Installation prefix
    pub prefix: PathBuf,
    /// Directory holding formula files
    pub formula_path: PathBuf,
    /// Build directory; a fresh temp dir per install when None
    pub build_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from("/usr/local"),
            formula_path: default_formula_path(),
            build_dir: None,
        }
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("formula/config.toml"))
    }

    /// Load configuration from `path`, or from the default location when
    /// None. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };

        let mut file = ConfigToml::default();
        if let Some(path) = path.filter(|p| p.exists()) {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let parsed: ConfigToml = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            file.merge(parsed);
        }

        let defaults = Self::default();
        Ok(Self {
            prefix: file.prefix.unwrap_or(defaults.prefix),
            formula_path: file.formula_path.unwrap_or(defaults.formula_path),
            build_dir: file.build_dir,
        })
    }

    /// Replace settings that were given explicitly on the command line or in
    /// the environment.
    pub fn apply_overrides(
        mut self,
        prefix: Option<PathBuf>,
        formula_path: Option<PathBuf>,
        build_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(p) = prefix {
            self.prefix = p;
        }
        if let Some(p) = formula_path {
            self.formula_path = p;
        }
        if build_dir.is_some() {
            self.build_dir = build_dir;
        }
        self
    }
}

/// Default formula directory (XDG compliant)
fn default_formula_path() -> PathBuf {
    let data_home = std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local/share")
        });

    data_home.join("formula/formulas")
}
