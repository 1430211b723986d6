//! Dependency preflight checks.
//!
//! Runs before any install step. Missing build or required dependencies fail
//! the install with `BuildError::DependencyMissing`; missing recommended ones
//! only warn, leaving the configure script to decide what it can build.
//! Nothing here installs dependencies.

use std::process::{Command, Stdio};

use crate::executor::BuildError;
use crate::formula::{Dependency, DependencyKind, Formula};
use crate::output::{self, CheckMark};
use crate::receipt::ReceiptStore;

/// Decides whether a dependency is present, and where.
pub trait DependencyProbe {
    /// Returns a short description of where the dependency was found, or
    /// None if it is absent.
    fn locate(&self, dep: &Dependency) -> Option<String>;
}

impl<F> DependencyProbe for F
where
    F: Fn(&Dependency) -> Option<String>,
{
    fn locate(&self, dep: &Dependency) -> Option<String> {
        self(dep)
    }
}

/// Looks for dependencies on the host: an install receipt in the prefix, an
/// executable on `PATH`, or a pkg-config module.
#[derive(Debug, Clone)]
pub struct HostProbe {
    receipts: ReceiptStore,
    pkg_config: bool,
}

impl HostProbe {
    pub fn new(receipts: ReceiptStore) -> Self {
        Self {
            receipts,
            pkg_config: true,
        }
    }

    /// Disable the pkg-config lookup.
    pub fn without_pkg_config(mut self) -> Self {
        self.pkg_config = false;
        self
    }
}

impl DependencyProbe for HostProbe {
    fn locate(&self, dep: &Dependency) -> Option<String> {
        if let Ok(Some(receipt)) = self.receipts.load(&dep.name) {
            return Some(format!("installed {}", receipt.version));
        }
        if let Ok(path) = which::which(&dep.name) {
            return Some(path.display().to_string());
        }
        if self.pkg_config && pkg_config_exists(&dep.name) {
            return Some("pkg-config".to_string());
        }
        None
    }
}

fn pkg_config_exists(module: &str) -> bool {
    Command::new("pkg-config")
        .args(["--exists", module])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Dependency found.
    Pass,
    /// Recommended dependency missing - install proceeds.
    Warn,
    /// Mandatory dependency missing - install will not start.
    Fail,
}

/// Result of checking a single dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub dependency: Dependency,
    pub status: CheckStatus,
    pub details: Option<String>,
}

/// Results of all dependency checks for one formula.
#[derive(Debug, Clone)]
pub struct PreflightReport {
    pub formula: String,
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if no mandatory dependency is missing.
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    /// Names of missing mandatory dependencies, in declaration order.
    pub fn missing(&self) -> Vec<String> {
        self.names_with(CheckStatus::Fail)
    }

    /// Names of missing recommended dependencies.
    pub fn warnings(&self) -> Vec<String> {
        self.names_with(CheckStatus::Warn)
    }

    fn names_with(&self, status: CheckStatus) -> Vec<String> {
        self.checks
            .iter()
            .filter(|c| c.status == status)
            .map(|c| c.dependency.name.clone())
            .collect()
    }

    /// Checks for dependencies playing `kind`, in declaration order.
    pub fn of_kind(&self, kind: DependencyKind) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(move |c| c.dependency.kind == kind)
    }

    /// Print one line per dependency.
    pub fn print(&self) {
        for check in &self.checks {
            let label = format!("{} ({})", check.dependency.name, check.dependency.kind);
            print_check(check, &label);
        }
    }

    /// Print the checks under one heading per role, build first.
    pub fn print_grouped(&self) {
        for kind in DependencyKind::ALL {
            let mut checks = self.of_kind(kind).peekable();
            if checks.peek().is_none() {
                continue;
            }
            output::sub_action(&format!("{}:", kind));
            for check in checks {
                print_check(check, &check.dependency.name);
            }
        }
    }

    /// Turn missing mandatory dependencies into an error.
    pub fn ensure(self) -> Result<Self, BuildError> {
        if self.all_passed() {
            Ok(self)
        } else {
            Err(BuildError::DependencyMissing {
                missing: self.missing(),
                formula: self.formula,
            })
        }
    }
}

fn print_check(check: &CheckResult, label: &str) {
    let mark = match check.status {
        CheckStatus::Pass => CheckMark::Ok,
        CheckStatus::Warn => CheckMark::Warn,
        CheckStatus::Fail => CheckMark::Fail,
    };
    output::check(mark, label, check.details.as_deref().unwrap_or("not found"));
}

/// Check every dependency of `formula` with `probe`.
pub fn check(formula: &Formula, probe: &impl DependencyProbe) -> PreflightReport {
    let checks = formula
        .dependencies
        .iter()
        .map(|dep| {
            let found = probe.locate(dep);
            let status = match (&found, dep.kind.is_mandatory()) {
                (Some(_), _) => CheckStatus::Pass,
                (None, true) => CheckStatus::Fail,
                (None, false) => CheckStatus::Warn,
            };
            CheckResult {
                dependency: dep.clone(),
                status,
                details: found,
            }
        })
        .collect();

    PreflightReport {
        formula: formula.name.clone(),
        checks,
    }
}
