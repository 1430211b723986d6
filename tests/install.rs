//! Install lifecycle tests against a real shell.
//!
//! The source tree is a fake autotools project whose scripts log each step,
//! so these tests see exactly which steps ran and what landed in the prefix.

mod common;

use common::{TestEnv, AUTOTOOLS_FORMULA, MISSING_DEP_FORMULA};
use levitate_formula::lock::acquire_install_lock;
use levitate_formula::{BuildError, Formula, InstallOptions, InstallOutcome, Installer};

fn opts(env: &TestEnv) -> InstallOptions {
    InstallOptions {
        source_dir: Some(env.source.clone()),
        ..Default::default()
    }
}

// =============================================================================
// Successful installs
// =============================================================================

#[test]
fn test_install_populates_prefix() {
    let env = TestEnv::new();
    env.autotools_source(0);
    let formula = Formula::parse(AUTOTOOLS_FORMULA).unwrap();

    let outcome = Installer::new(&env.prefix)
        .install(&formula, &opts(&env))
        .unwrap();

    assert!(matches!(outcome, InstallOutcome::Installed(_)));
    assert!(env.prefix.join("bin/fakefs").is_file());
    assert_eq!(
        env.step_log(),
        vec![
            "bootstrap".to_string(),
            format!("configure --prefix={}", env.prefix.display()),
            "install".to_string(),
        ]
    );
}

#[test]
fn test_install_records_receipt() {
    let env = TestEnv::new();
    env.autotools_source(0);
    let formula = Formula::parse(AUTOTOOLS_FORMULA).unwrap();
    let installer = Installer::new(&env.prefix);

    installer.install(&formula, &opts(&env)).unwrap();

    let receipt = installer.receipts().load("fakefs").unwrap().unwrap();
    assert_eq!(receipt.version, "1.0");
    assert_eq!(receipt.prefix, env.prefix);
    assert_eq!(receipt.steps.len(), 3);
    assert!(env.prefix.join("var/lib/formula/fakefs.toml").is_file());
}

#[test]
fn test_reinstall_same_version_is_noop() {
    let env = TestEnv::new();
    env.autotools_source(0);
    let formula = Formula::parse(AUTOTOOLS_FORMULA).unwrap();
    let installer = Installer::new(&env.prefix);

    installer.install(&formula, &opts(&env)).unwrap();
    let second = installer.install(&formula, &opts(&env)).unwrap();

    assert!(matches!(second, InstallOutcome::AlreadyInstalled(_)));
    assert_eq!(env.step_log().len(), 3);
}

#[test]
fn test_forced_reinstall_reruns_identically() {
    let env = TestEnv::new();
    env.autotools_source(0);
    let formula = Formula::parse(AUTOTOOLS_FORMULA).unwrap();
    let installer = Installer::new(&env.prefix);

    installer.install(&formula, &opts(&env)).unwrap();
    let forced = InstallOptions {
        force: true,
        ..opts(&env)
    };
    installer.install(&formula, &forced).unwrap();

    let log = env.step_log();
    assert_eq!(log.len(), 6);
    assert_eq!(log[..3], log[3..]);
}

#[test]
fn test_formula_install_builds_in_current_dir() {
    let env = TestEnv::new();
    let formula = Formula::parse(
        r#"(formula "direct" (url "/unused") (version "1")
             (install (system "mkdir -p \"$PREFIX/share\"")
                      (system "echo $VERSION > \"$PREFIX/share/direct-version\"")
                      (system "test -d \"$BUILD_DIR\" && test \"$BUILD_DIR\" = \"$(pwd -P)\"")))"#,
    )
    .unwrap();

    formula.install(&env.prefix).unwrap();

    let written = std::fs::read_to_string(env.prefix.join("share/direct-version")).unwrap();
    assert_eq!(written.trim(), "1");
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_configure_failure_stops_install() {
    let env = TestEnv::new();
    env.autotools_source(3);
    let formula = Formula::parse(AUTOTOOLS_FORMULA).unwrap();
    let installer = Installer::new(&env.prefix);

    let err = installer.install(&formula, &opts(&env)).unwrap_err();

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::StepFailed { index, code, output, command }) => {
            assert_eq!(*index, 1);
            assert_eq!(*code, Some(3));
            assert!(command.starts_with("./configure --prefix="));
            assert!(output.contains("checking for glib... no"));
            assert!(output.contains("configure: error: glib not found"));
        }
        other => panic!("expected StepFailed, got {other:?}"),
    }

    assert_eq!(env.step_log().len(), 2);
    assert!(!env.prefix.join("bin/fakefs").exists());
    assert!(installer.receipts().load("fakefs").unwrap().is_none());
}

#[test]
fn test_bootstrap_failure_runs_nothing_else() {
    let env = TestEnv::new();
    env.autotools_source(0);
    common::write_script(&env.source.join("autogen.sh"), "#!/bin/sh\nexit 1\n");
    let formula = Formula::parse(AUTOTOOLS_FORMULA).unwrap();

    let err = Installer::new(&env.prefix)
        .install(&formula, &opts(&env))
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::StepFailed { index: 0, code: Some(1), .. })
    ));
    assert!(env.step_log().is_empty());
}

#[test]
fn test_missing_dependency_is_reported_before_install() {
    let env = TestEnv::new();
    let formula = Formula::parse(MISSING_DEP_FORMULA).unwrap();

    let err = Installer::new(&env.prefix)
        .install(&formula, &opts(&env))
        .unwrap_err();

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::DependencyMissing { formula, missing }) => {
            assert_eq!(formula, "needy");
            assert_eq!(missing, &vec!["no-such-tool-for-formula-tests".to_string()]);
        }
        other => panic!("expected DependencyMissing, got {other:?}"),
    }
    assert!(!env.prefix.join("should-not-exist").exists());
}

#[test]
fn test_dependency_satisfied_by_receipt() {
    let env = TestEnv::new();
    let installer = Installer::new(&env.prefix);

    let provider = Formula::parse(
        r#"(formula "no-such-tool-for-formula-tests" (url "/unused") (version "2")
             (install (system "true")))"#,
    )
    .unwrap();
    installer.install(&provider, &opts(&env)).unwrap();

    let needy = Formula::parse(MISSING_DEP_FORMULA).unwrap();
    installer.install(&needy, &opts(&env)).unwrap();
    assert!(env.prefix.join("should-not-exist").exists());
}

#[test]
fn test_dry_run_touches_nothing() {
    let env = TestEnv::new();
    env.autotools_source(0);
    let formula = Formula::parse(AUTOTOOLS_FORMULA).unwrap();
    let opts = InstallOptions {
        dry_run: true,
        ..opts(&env)
    };

    let outcome = Installer::new(&env.prefix).install(&formula, &opts).unwrap();

    match outcome {
        InstallOutcome::DryRun(report) => assert_eq!(report.steps.len(), 3),
        other => panic!("expected DryRun, got {other:?}"),
    }
    assert!(env.step_log().is_empty());
    assert!(!env.prefix.exists());
}

#[test]
fn test_install_refused_while_another_holds_the_lock() {
    let env = TestEnv::new();
    env.autotools_source(0);
    let formula = Formula::parse(AUTOTOOLS_FORMULA).unwrap();
    let installer = Installer::new(&env.prefix);
    let _held = acquire_install_lock(installer.receipts().dir(), "fakefs").unwrap();

    let err = installer.install(&formula, &opts(&env)).unwrap_err();

    assert!(err.to_string().contains("already being installed"));
    assert!(env.step_log().is_empty());
    assert!(!env.prefix.join("bin/fakefs").exists());
}
