//! Declarative package formulas and their installer
//!
//! A formula describes one package: its homepage, where its source lives,
//! which version that is, what it depends on, and the ordered shell steps
//! that install it under a prefix. Installing runs those steps one after the
//! other and stops at the first that fails.
//!
//! # Example Formula
//!
//! ```lisp
//! (formula "riofs"
//!   (homepage "https://github.com/skoobe/riofs")
//!   (url "https://github.com/skoobe/riofs.git")
//!   (version "0.6")
//!   (depends-on "autoconf" build)
//!   (depends-on "glib")
//!   (depends-on "openssl" recommended)
//!   (install
//!     (system "./autogen.sh")
//!     (system "./configure --prefix=#{prefix}")
//!     (system "make install")))
//! ```
//!
//! # Dependencies
//!
//! `(depends-on "name")` declares a runtime dependency. A trailing `build`
//! tag marks a build-only tool, `recommended` an optional runtime feature.
//! Before installing, missing build and runtime dependencies stop the install;
//! missing recommended ones only warn. Dependencies are checked, never
//! installed.
//!
//! # Variables Available in Steps
//!
//! - `$PREFIX` / `#{prefix}` - Installation prefix
//! - `$BUILD_DIR` / `#{buildpath}` - Build directory
//! - `$NAME`, `$VERSION` - Formula name and version
//! - `$ARCH` - Target architecture (x86_64, aarch64)
//! - `$NPROC` - Number of CPUs
//!
//! # Library Use
//!
//! ```no_run
//! use levitate_formula::Formula;
//!
//! let formula = Formula::load("formulas/riofs.formula".as_ref())?;
//! formula.install("/opt/riofs")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ast;
pub mod config;
pub mod executor;
pub mod fetch;
pub mod formula;
pub mod installer;
pub mod lock;
pub mod output;
pub mod parser;
pub mod preflight;
pub mod receipt;
pub mod repository;
pub mod template;

pub use executor::{BuildError, Context, Executor, InstallReport, ShellRunner, StepOutput, StepRunner};
pub use formula::{Dependency, DependencyKind, Formula, FormulaError, Source};
pub use installer::{InstallOptions, InstallOutcome, Installer};
pub use parser::{parse, ParseError};
pub use repository::Repository;
