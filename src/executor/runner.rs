//! Step runners - how a single expanded command gets executed.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Result of running one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    /// Exit code, None if the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured stdout followed by stderr.
    pub output: String,
}

impl StepOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an already-expanded install step.
pub trait StepRunner {
    fn run(
        &mut self,
        command: &str,
        dir: &Path,
        env: &[(&'static str, String)],
    ) -> io::Result<StepOutput>;
}

/// Runs steps through `sh -c`, capturing their output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl StepRunner for ShellRunner {
    fn run(
        &mut self,
        command: &str,
        dir: &Path,
        env: &[(&'static str, String)],
    ) -> io::Result<StepOutput> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
            .stdin(Stdio::null())
            .output()?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(StepOutput {
            code: output.status.code(),
            output: text,
        })
    }
}
