//! Common test utilities for formula integration tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;

use levitate_formula::{Formula, StepOutput, StepRunner};
use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// Temp directories for one test: a prefix, a source tree and a formula repo.
pub struct TestEnv {
    pub dir: TempDir,
    pub prefix: PathBuf,
    pub source: PathBuf,
    pub formulas: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("prefix");
        let source = dir.path().join("src");
        let formulas = dir.path().join("formulas");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&formulas).unwrap();
        Self {
            dir,
            prefix,
            source,
            formulas,
        }
    }

    /// Write a formula file into the repo and return its path.
    pub fn write_formula(&self, name: &str, content: &str) -> PathBuf {
        let path = self.formulas.join(format!("{}.formula", name));
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Populate the source tree with a fake autotools project.
    ///
    /// `configure_exit` is the status ./configure exits with.
    pub fn autotools_source(&self, configure_exit: i32) {
        write_script(&self.source.join("autogen.sh"), AUTOGEN_SH);
        write_script(
            &self.source.join("configure"),
            &CONFIGURE_SH.replace("@EXIT@", &configure_exit.to_string()),
        );
        write_script(&self.source.join("install.sh"), INSTALL_SH);
    }

    /// Lines appended to `steps.log` by the fake project scripts.
    pub fn step_log(&self) -> Vec<String> {
        std::fs::read_to_string(self.source.join("steps.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

pub fn write_script(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}

/// The riofs formula shipped in `formulas/`.
pub fn riofs() -> Formula {
    Formula::parse(RIOFS_FORMULA).unwrap()
}

/// Step runner that records commands instead of running them, failing the
/// step at `fail_at` with `fail_code`.
#[derive(Clone, Default)]
pub struct Recorder {
    pub calls: Rc<RefCell<Vec<String>>>,
    pub fail_at: Option<usize>,
    pub fail_code: i32,
}

impl Recorder {
    pub fn failing_at(index: usize, code: i32) -> Self {
        Self {
            fail_at: Some(index),
            fail_code: code,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl StepRunner for Recorder {
    fn run(
        &mut self,
        command: &str,
        _dir: &Path,
        _env: &[(&'static str, String)],
    ) -> io::Result<StepOutput> {
        let mut calls = self.calls.borrow_mut();
        let failed = self.fail_at == Some(calls.len());
        calls.push(command.to_string());
        Ok(StepOutput {
            code: Some(if failed { self.fail_code } else { 0 }),
            output: if failed { "boom\n".to_string() } else { String::new() },
        })
    }
}
