//! Install orchestration.
//!
//! Wraps `Executor::install` with everything around it: the per-formula
//! lock, the receipt check that makes repeat installs a no-op, dependency
//! preflight, source fetching, and the receipt written on success.
//!
//! The flow for one formula:
//! 1. lock - refuse to run twice for the same prefix
//! 2. receipt - same version already installed? skip unless forced
//! 3. preflight - missing mandatory dependencies abort here
//! 4. fetch - local directory, `--source`, or a git clone
//! 5. install - run the steps, first failure wins
//! 6. receipt - record what ran

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::executor::{Context, Executor, InstallReport, ShellRunner, StepRunner};
use crate::fetch;
use crate::formula::Formula;
use crate::lock::acquire_install_lock;
use crate::output;
use crate::preflight::{self, DependencyProbe, HostProbe};
use crate::receipt::{Receipt, ReceiptStore};

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Re-run the steps even if the same version is installed.
    pub force: bool,
    /// Print the steps without running them.
    pub dry_run: bool,
    /// Skip the dependency preflight.
    pub ignore_deps: bool,
    /// Keep a temporary build directory after a successful install.
    pub keep_build: bool,
    /// Print each step's output.
    pub verbose: bool,
    /// Use this source tree instead of fetching.
    pub source_dir: Option<PathBuf>,
    /// Build here instead of in a fresh temp dir.
    pub build_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed(InstallReport),
    AlreadyInstalled(Receipt),
    DryRun(InstallReport),
}

pub struct Installer<P = HostProbe> {
    prefix: PathBuf,
    receipts: ReceiptStore,
    probe: P,
}

impl Installer {
    /// Installer for `prefix` that probes the host for dependencies.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        let receipts = ReceiptStore::for_prefix(&prefix);
        let probe = HostProbe::new(receipts.clone());
        Self {
            prefix,
            receipts,
            probe,
        }
    }
}

impl<P: DependencyProbe> Installer<P> {
    pub fn with_probe(prefix: impl Into<PathBuf>, probe: P) -> Self {
        let prefix = prefix.into();
        let receipts = ReceiptStore::for_prefix(&prefix);
        Self {
            prefix,
            receipts,
            probe,
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn receipts(&self) -> &ReceiptStore {
        &self.receipts
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Install `formula` with the host shell.
    pub fn install(&self, formula: &Formula, opts: &InstallOptions) -> Result<InstallOutcome> {
        self.install_with(formula, opts, ShellRunner)
    }

    /// Install `formula`, running steps with `runner`.
    ///
    /// Step and dependency failures are returned as `BuildError` inside the
    /// `anyhow::Error`, so callers can downcast for the exit code and output.
    pub fn install_with<R: StepRunner>(
        &self,
        formula: &Formula,
        opts: &InstallOptions,
        runner: R,
    ) -> Result<InstallOutcome> {
        output::action(&format!("Installing {} {}", formula.name, formula.version()));

        // A dry run writes nothing under the prefix, the lock file included.
        let _lock = if opts.dry_run {
            None
        } else {
            Some(acquire_install_lock(self.receipts.dir(), &formula.name)?)
        };

        if !opts.force
            && let Some(receipt) = self.receipts.load(&formula.name)?
            && receipt.version == formula.source.version
        {
            output::skip(&format!(
                "{} {} already installed, skipping",
                formula.name, receipt.version
            ));
            return Ok(InstallOutcome::AlreadyInstalled(receipt));
        }

        if opts.ignore_deps {
            output::detail("dependency check skipped");
        } else {
            let report = preflight::check(formula, &self.probe);
            report.print();
            for name in report.warnings() {
                output::warning(&format!("recommended dependency {} not found", name));
            }
            report.ensure()?;
        }

        let build = BuildDir::create(opts.build_dir.as_deref())?;

        let source_dir = match (&opts.source_dir, opts.dry_run) {
            (Some(dir), _) => dir.clone(),
            (None, true) => build
                .path()
                .join(format!("{}-{}", formula.name, formula.version())),
            (None, false) => fetch::fetch(&formula.source, build.path())?,
        };

        let ctx = Context::with_prefix(&self.prefix)
            .work_dir(source_dir)
            .build_dir(build.path())
            .dry_run(opts.dry_run)
            .verbose(opts.verbose);

        let mut executor = Executor::with_runner(ctx, runner);
        let report = match executor.install(formula) {
            Ok(report) => report,
            Err(e) => {
                let kept = build.keep();
                output::warning(&format!("build directory kept at {}", kept.display()));
                return Err(e.into());
            }
        };

        if opts.dry_run {
            return Ok(InstallOutcome::DryRun(report));
        }

        let receipt_path = self.receipts.save(&Receipt::from_report(&report))?;
        output::detail(&format!("receipt {}", receipt_path.display()));

        if opts.keep_build {
            let kept = build.keep();
            output::detail(&format!("build directory kept at {}", kept.display()));
        }

        output::success(&format!("{} {} installed", formula.name, formula.version()));
        Ok(InstallOutcome::Installed(report))
    }
}

/// Build directory for one install: caller-provided, or a temp dir that is
/// removed on drop unless kept.
enum BuildDir {
    Given(PathBuf),
    Temp(TempDir),
}

impl BuildDir {
    fn create(given: Option<&Path>) -> Result<Self> {
        match given {
            Some(dir) => {
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create build directory: {}", dir.display())
                })?;
                Ok(Self::Given(dir.to_path_buf()))
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("formula-build-")
                    .tempdir()
                    .context("Failed to create temporary build directory")?;
                Ok(Self::Temp(temp))
            }
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Given(p) => p,
            Self::Temp(t) => t.path(),
        }
    }

    fn keep(self) -> PathBuf {
        match self {
            Self::Given(p) => p,
            Self::Temp(t) => t.keep(),
        }
    }
}
