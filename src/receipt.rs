//! Install receipts - what was installed into a prefix, and from which
//! version.
//!
//! One TOML file per formula lives under `<prefix>/var/lib/formula/`. A
//! receipt is written only after every install step succeeded.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::executor::InstallReport;

/// Receipt directory relative to the prefix.
pub const RECEIPT_DIR: &str = "var/lib/formula";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub name: String,
    pub version: String,
    pub prefix: PathBuf,
    /// Seconds since the Unix epoch.
    pub installed_at: u64,
    /// Expanded commands that ran.
    pub steps: Vec<String>,
}

impl Receipt {
    pub fn from_report(report: &InstallReport) -> Self {
        let installed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            name: report.formula.clone(),
            version: report.version.clone(),
            prefix: report.prefix.clone(),
            installed_at,
            steps: report.steps.clone(),
        }
    }
}

/// Directory of receipts for one prefix.
#[derive(Debug, Clone)]
pub struct ReceiptStore {
    dir: PathBuf,
}

impl ReceiptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_prefix(prefix: &Path) -> Self {
        Self::new(prefix.join(RECEIPT_DIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.toml", name))
    }

    /// Load the receipt for `name`, None if it was never installed.
    pub fn load(&self, name: &str) -> Result<Option<Receipt>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read receipt: {}", path.display()))?;
        let receipt = toml::from_str(&content)
            .with_context(|| format!("Failed to parse receipt: {}", path.display()))?;
        Ok(Some(receipt))
    }

    /// Write a receipt, replacing any previous one atomically.
    pub fn save(&self, receipt: &Receipt) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create receipt directory: {}", self.dir.display()))?;

        let path = self.path_for(&receipt.name);
        let tmp = path.with_extension("toml.tmp");
        let content = toml::to_string(receipt).context("Failed to serialize receipt")?;
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write receipt: {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to write receipt: {}", path.display()))?;
        Ok(path)
    }

    /// All receipts in the store, sorted by name.
    pub fn list(&self) -> Result<Vec<Receipt>> {
        let mut receipts = Vec::new();
        if !self.dir.exists() {
            return Ok(receipts);
        }

        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read receipt directory: {}", self.dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "toml")
                && let Some(name) = path.file_stem().and_then(|s| s.to_str())
                && let Some(receipt) = self.load(name)?
            {
                receipts.push(receipt);
            }
        }

        receipts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(receipts)
    }
}
