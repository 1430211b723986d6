//! Formula CLI - install packages from declarative formulas
//!
//! Usage:
//!   formula install <name>          Install a formula
//!   formula info <name>             Show formula details
//!   formula deps <name>             Check a formula's dependencies
//!   formula list                    List available formulas
//!   formula check <file>            Validate a formula file
//!   formula fmt <file>              Re-serialize a formula file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use levitate_formula::config::Config;
use levitate_formula::preflight::{self, HostProbe};
use levitate_formula::receipt::ReceiptStore;
use levitate_formula::{
    output, BuildError, DependencyKind, Formula, InstallOptions, InstallOutcome, Installer,
    Repository,
};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "formula")]
#[command(about = "Install packages from declarative formulas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to formulas directory
    #[arg(short = 'f', long, global = true, env = "FORMULA_PATH")]
    formula_path: Option<PathBuf>,

    /// Installation prefix
    #[arg(short, long, global = true, env = "FORMULA_PREFIX")]
    prefix: Option<PathBuf>,

    /// Build directory (uses temp dir if not specified)
    #[arg(short, long, global = true)]
    build_dir: Option<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/formula/config.toml)
    #[arg(long, global = true, env = "FORMULA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a formula
    Install {
        /// Formula name or path to formula file
        formula: String,

        /// Reinstall even if this version is already installed
        #[arg(long)]
        force: bool,

        /// Print the steps without running them
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Skip the dependency check
        #[arg(long)]
        ignore_deps: bool,

        /// Use an existing source tree instead of fetching
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Keep the temporary build directory after success
        #[arg(long)]
        keep_build: bool,

        /// Show each step's output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show formula information
    Info {
        /// Formula name or path to formula file
        formula: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a formula's dependencies on this host
    Deps {
        /// Formula name or path to formula file
        formula: String,
    },

    /// List available formulas
    List,

    /// Parse and validate a formula file
    Check {
        /// Path to formula file
        file: PathBuf,
    },

    /// Re-serialize a formula file
    Fmt {
        /// Path to formula file
        file: PathBuf,

        /// Output syntax
        #[arg(long, value_enum, default_value_t = Syntax::Formula)]
        to: Syntax,

        /// Rewrite the file in place instead of printing
        #[arg(short, long)]
        write: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Syntax {
    Formula,
    Toml,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err),
    }
}

/// Print an error and pick the exit code. A failed step exits with the
/// step's own status and prints its captured output verbatim.
fn report_error(err: &anyhow::Error) -> ExitCode {
    if let Some(BuildError::StepFailed { output: captured, code, .. }) =
        err.downcast_ref::<BuildError>()
    {
        eprint!("{}", captured);
        output::error(&err.to_string());
        return code
            .and_then(|c| u8::try_from(c).ok())
            .filter(|&c| c != 0)
            .map(ExitCode::from)
            .unwrap_or(ExitCode::FAILURE);
    }

    output::error(&format!("{:#}", err));
    ExitCode::FAILURE
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?.apply_overrides(
        cli.prefix,
        cli.formula_path,
        cli.build_dir,
    );
    let repo = Repository::new(&config.formula_path);

    match cli.command {
        Commands::Install {
            formula,
            force,
            dry_run,
            ignore_deps,
            source,
            keep_build,
            verbose,
        } => {
            let formula = repo.load(&formula)?;
            let opts = InstallOptions {
                force,
                dry_run,
                ignore_deps,
                keep_build,
                verbose,
                source_dir: source,
                build_dir: config.build_dir.clone(),
            };

            let outcome = Installer::new(&config.prefix).install(&formula, &opts)?;
            if let InstallOutcome::DryRun(report) = outcome {
                output::info(&format!(
                    "dry run: {} step(s) for {} would run in {}",
                    report.steps.len(),
                    report.formula,
                    report.prefix.display()
                ));
            }
        }

        Commands::Info { formula, json } => {
            let formula = repo.load(&formula)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&formula)?);
            } else {
                show_info(&formula, &ReceiptStore::for_prefix(&config.prefix))?;
            }
        }

        Commands::Deps { formula } => {
            let formula = repo.load(&formula)?;
            let probe = HostProbe::new(ReceiptStore::for_prefix(&config.prefix));
            let report = preflight::check(&formula, &probe);

            output::info(&format!("Dependencies for {}:", formula.name.bold()));
            if report.checks.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            report.print_grouped();
            report.ensure()?;
        }

        Commands::List => {
            list_formulas(&repo, &ReceiptStore::for_prefix(&config.prefix))?;
        }

        Commands::Check { file } => {
            let formula = Formula::load(&file)
                .with_context(|| format!("Invalid formula: {}", file.display()))?;
            output::success(&format!(
                "{} {} ok ({} dependencies, {} steps)",
                formula.name,
                formula.version(),
                formula.dependencies.len(),
                formula.install_steps.len()
            ));
        }

        Commands::Fmt { file, to, write } => {
            let formula = Formula::load(&file)
                .with_context(|| format!("Invalid formula: {}", file.display()))?;
            let (text, ext) = match to {
                Syntax::Formula => (formula.to_string(), "formula"),
                Syntax::Toml => (formula.to_toml()?, "toml"),
            };

            if write {
                let dest = file.with_extension(ext);
                std::fs::write(&dest, text)
                    .with_context(|| format!("Failed to write {}", dest.display()))?;
                output::success(&format!("wrote {}", dest.display()));
            } else {
                print!("{}", text);
            }
        }
    }

    Ok(())
}

fn show_info(formula: &Formula, receipts: &ReceiptStore) -> Result<()> {
    println!("{} {}", formula.name.bold(), formula.version());
    if let Some(ref desc) = formula.description {
        println!("{}", desc);
    }
    if let Some(ref homepage) = formula.homepage {
        println!("{}", homepage.cyan());
    }
    println!("{} {}", "source:".dimmed(), formula.source.url);

    match receipts.load(&formula.name)? {
        Some(r) => println!("{} {} in {}", "installed:".dimmed(), r.version.green(), r.prefix.display()),
        None => println!("{} {}", "installed:".dimmed(), "no".dimmed()),
    }

    for kind in DependencyKind::ALL {
        let names: Vec<_> = formula.dependencies_of(kind).map(|d| d.name.as_str()).collect();
        if !names.is_empty() {
            println!("{} {}", format!("{} deps:", kind).dimmed(), names.join(", "));
        }
    }

    println!("{}", "install:".dimmed());
    for (i, step) in formula.install_steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
    Ok(())
}

fn list_formulas(repo: &Repository, receipts: &ReceiptStore) -> Result<()> {
    let formulas = repo.formulas()?;
    if formulas.is_empty() {
        output::info(&format!("No formulas in {}", repo.root().display()));
        return Ok(());
    }

    for (path, loaded) in formulas {
        match loaded {
            Ok(formula) => {
                let installed = receipts.load(&formula.name)?;
                let status = match installed {
                    Some(ref r) if r.version == formula.source.version => {
                        format!("{} [installed]", formula.version())
                    }
                    Some(ref r) => format!("{} [installed {}]", formula.version(), r.version),
                    None => formula.version().to_string(),
                };
                output::list_item(&formula.name, &status, installed.is_some());
            }
            Err(e) => output::warning(&format!("{}: {:#}", path.display(), e)),
        }
    }
    Ok(())
}
