//! Execution context providing configuration for formula installs.

use crate::formula::Formula;
use crate::template::Vars;
use std::path::PathBuf;

/// Execution context providing configuration for formula installs.
#[derive(Debug, Clone)]
pub struct Context {
    /// Installation prefix (default: /usr/local)
    pub prefix: PathBuf,
    /// Directory the install steps run in (the source tree)
    pub work_dir: PathBuf,
    /// Scratch directory exposed to steps as `$BUILD_DIR`
    pub build_dir: PathBuf,
    /// Target architecture (e.g., "x86_64", "aarch64")
    pub arch: String,
    /// Number of parallel jobs for builds
    pub nproc: usize,
    /// If true, log commands without executing them
    pub dry_run: bool,
    /// If true, print each step's captured output once the step exits
    /// instead of showing a spinner
    pub verbose: bool,
}

impl Default for Context {
    fn default() -> Self {
        let build_dir = std::env::temp_dir().join("formula-build");
        Self {
            prefix: PathBuf::from("/usr/local"),
            work_dir: build_dir.clone(),
            build_dir,
            arch: std::env::consts::ARCH.to_string(),
            nproc: num_cpus::get(),
            dry_run: false,
            verbose: false,
        }
    }
}

impl Context {
    /// Create a new context with the given prefix.
    pub fn with_prefix(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    /// Set the directory steps run in.
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Set the build directory.
    pub fn build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = dir.into();
        self
    }

    /// Set the target architecture.
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Set the number of parallel jobs.
    pub fn nproc(mut self, nproc: usize) -> Self {
        self.nproc = nproc.max(1);
        self
    }

    /// Set dry run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set verbose mode.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Template variables for installing `formula` under this context.
    pub fn vars(&self, formula: &Formula) -> Vars {
        Vars {
            prefix: self.prefix.clone(),
            build_dir: self.build_dir.clone(),
            nproc: self.nproc,
            arch: self.arch.clone(),
            name: formula.name.clone(),
            version: formula.source.version.clone(),
        }
    }
}
