//! Formula executor - runs a formula's install steps in order.
//!
//! Each step is expanded against the context, handed to a `StepRunner`, and
//! must exit zero before the next one starts. The first failure ends the
//! install; there is no retry and no rollback.

mod context;
mod error;
mod runner;

pub use context::Context;
pub use error::BuildError;
pub use runner::{ShellRunner, StepOutput, StepRunner};

use crate::formula::Formula;
use crate::output;
use serde::Serialize;
use std::path::PathBuf;

/// What an install ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub formula: String,
    pub version: String,
    pub prefix: PathBuf,
    /// Expanded commands, in execution order.
    pub steps: Vec<String>,
    pub dry_run: bool,
}

/// Formula executor that runs install steps with a `StepRunner`.
pub struct Executor<R = ShellRunner> {
    ctx: Context,
    runner: R,
}

impl Executor {
    /// Create an executor that runs steps with the host shell.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            runner: ShellRunner,
        }
    }
}

impl<R: StepRunner> Executor<R> {
    /// Create an executor with a custom step runner.
    pub fn with_runner(ctx: Context, runner: R) -> Self {
        Self { ctx, runner }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn into_runner(self) -> R {
        self.runner
    }

    /// The commands `install` would run, fully expanded.
    pub fn plan(&self, formula: &Formula) -> Vec<String> {
        let vars = self.ctx.vars(formula);
        formula
            .install_steps
            .iter()
            .map(|step| vars.expand(step))
            .collect()
    }

    /// Run every install step of `formula` in order.
    pub fn install(&mut self, formula: &Formula) -> Result<InstallReport, BuildError> {
        let vars = self.ctx.vars(formula);
        let env = vars.env();
        let steps = self.plan(formula);
        let total = steps.len();

        if !self.ctx.dry_run {
            std::fs::create_dir_all(&self.ctx.prefix)?;
        }

        for (index, command) in steps.iter().enumerate() {
            output::sub_action(&format!("[{}/{}] {}", index + 1, total, command));

            if self.ctx.dry_run {
                output::detail("[dry-run] not executed");
                continue;
            }

            let pb = (!self.ctx.verbose).then(|| output::spinner(&display_cmd(command)));
            let result = self.runner.run(command, &self.ctx.work_dir, &env);
            if let Some(pb) = pb {
                output::progress_done(pb);
            }

            let out = result.map_err(|source| BuildError::Spawn {
                index,
                command: command.clone(),
                source,
            })?;

            if self.ctx.verbose {
                for line in out.output.lines() {
                    output::detail(line);
                }
            }

            if !out.success() {
                return Err(BuildError::StepFailed {
                    index,
                    command: command.clone(),
                    code: out.code,
                    output: out.output,
                });
            }
        }

        Ok(InstallReport {
            formula: formula.name.clone(),
            version: formula.source.version.clone(),
            prefix: self.ctx.prefix.clone(),
            steps,
            dry_run: self.ctx.dry_run,
        })
    }
}

/// Truncate long commands for spinner display.
fn display_cmd(cmd: &str) -> String {
    match cmd.char_indices().nth(57) {
        Some((cut, _)) if cmd.chars().count() > 60 => format!("{}...", &cmd[..cut]),
        _ => cmd.to_string(),
    }
}
