//! Formula repository - a directory of formula files.
//!
//! A formula named `riofs` is found as `riofs.formula`, `riofs.toml`, or
//! `riofs/riofs.formula` under the repository root.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::formula::{self, Formula};

/// File extensions recognised as formulas, in lookup order.
pub const EXTENSIONS: [&str; 2] = ["formula", "toml"];

#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a formula name or an explicit file path.
    pub fn resolve(&self, name_or_path: &str) -> Result<PathBuf> {
        let is_explicit_path = name_or_path.contains('/')
            || name_or_path.contains('\\')
            || EXTENSIONS
                .iter()
                .any(|ext| name_or_path.ends_with(&format!(".{}", ext)));

        if is_explicit_path {
            let as_path = PathBuf::from(name_or_path);
            if as_path.is_file() {
                return Ok(as_path);
            }
            bail!("Formula file not found: {}", name_or_path);
        }

        // Names double as file names, so reject anything that could escape the root
        formula::validate_name(name_or_path)?;

        for ext in EXTENSIONS {
            let flat = self.root.join(format!("{}.{}", name_or_path, ext));
            if flat.is_file() {
                return Ok(flat);
            }
            let nested = self
                .root
                .join(name_or_path)
                .join(format!("{}.{}", name_or_path, ext));
            if nested.is_file() {
                return Ok(nested);
            }
        }

        bail!(
            "Formula not found: {}\nSearched in: {}",
            name_or_path,
            self.root.display()
        )
    }

    /// Resolve and load a formula.
    pub fn load(&self, name_or_path: &str) -> Result<Formula> {
        let path = self.resolve(name_or_path)?;
        Formula::load(&path).with_context(|| format!("Invalid formula: {}", path.display()))
    }

    /// Paths of every formula file in the repository, sorted.
    pub fn formula_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        if !self.root.exists() {
            return Ok(paths);
        }

        for ext in EXTENSIONS {
            for pattern in [format!("*.{}", ext), format!("*/*.{}", ext)] {
                let full = self.root.join(pattern);
                let matches = glob::glob(&full.to_string_lossy())
                    .with_context(|| format!("Invalid glob pattern: {}", full.display()))?;
                paths.extend(matches.filter_map(|m| m.ok()));
            }
        }

        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Load every formula, returning load failures alongside successes.
    pub fn formulas(&self) -> Result<Vec<(PathBuf, Result<Formula>)>> {
        Ok(self
            .formula_paths()?
            .into_iter()
            .map(|path| {
                let loaded = Formula::load(&path).map_err(anyhow::Error::from);
                (path, loaded)
            })
            .collect())
    }
}
