//! Source fetching
//!
//! Turns a formula's `url` into a source tree the install steps can run in.
//! Local directories are used in place; git URLs are shallow-cloned into the
//! build directory.

use crate::formula::Source;
use crate::output;
use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Where a formula's source comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// A directory on this machine.
    Local(PathBuf),
    /// A git remote.
    Git(String),
}

/// RAII guard for progress bars - ensures cleanup on any exit path
struct ProgressGuard(ProgressBar);

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}

/// Classify a source URL.
///
/// Only https://, http://, ssh://, git@ and local paths are accepted.
pub fn classify(url: &str) -> Result<SourceKind> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(SourceKind::Local(PathBuf::from(path)));
    }
    if url.starts_with("https://")
        || url.starts_with("http://")
        || url.starts_with("ssh://")
        || url.starts_with("git@")
    {
        return Ok(SourceKind::Git(url.to_string()));
    }
    if url.starts_with('/') || url.starts_with("./") || url.starts_with("../") {
        return Ok(SourceKind::Local(PathBuf::from(url)));
    }
    bail!(
        "Unsupported source URL: {}\n\
         Only https://, http://, ssh://, git@, file:// URLs and local paths are supported",
        url
    )
}

/// Extract the repository name from a git URL
/// (e.g. "riofs" from "https://github.com/skoobe/riofs.git").
pub fn repo_name(url: &str) -> Result<String> {
    let name = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or("")
        .trim_end_matches(".git");

    if name.is_empty() || name == "." || name == ".." {
        bail!("Cannot determine repository name from URL: {}", url);
    }
    Ok(name.to_string())
}

/// Produce a source tree for `source`, cloning into `build_dir` if needed.
pub fn fetch(source: &Source, build_dir: &Path) -> Result<PathBuf> {
    match classify(&source.url)? {
        SourceKind::Local(path) => {
            if !path.is_dir() {
                bail!("Source directory does not exist: {}", path.display());
            }
            output::detail(&format!("using source at {}", path.display()));
            Ok(path)
        }
        SourceKind::Git(url) => {
            let dest = build_dir.join(format!("{}-{}", repo_name(&url)?, source.version));
            git_clone(&url, &source.version, &dest)?;
            Ok(dest)
        }
    }
}

/// Shallow-clone `url` at tag `version`, falling back to the default branch
/// when no such tag exists.
fn git_clone(url: &str, version: &str, dest: &Path) -> Result<()> {
    if dest.join(".git").exists() {
        output::detail(&format!("git: {} already cloned", dest.display()));
        return Ok(());
    }

    output::detail(&format!("git clone {}", url));
    let _guard = ProgressGuard(output::spinner(&format!("cloning {}", url)));

    let tagged = run_git(&["clone", "--depth", "1", "--branch", version, url], dest)?;
    if tagged.status.success() {
        return Ok(());
    }

    let _ = std::fs::remove_dir_all(dest);
    output::warning(&format!(
        "no tag '{}' in {}, cloning the default branch",
        version, url
    ));

    let plain = run_git(&["clone", "--depth", "1", url], dest)?;
    if !plain.status.success() {
        let stderr = String::from_utf8_lossy(&plain.stderr);
        bail!("git clone failed for {}\nDetails: {}", url, stderr.trim());
    }
    Ok(())
}

fn run_git(args: &[&str], dest: &Path) -> Result<std::process::Output> {
    Command::new("git")
        .args(args)
        .arg(dest)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .context("failed to run git")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("https://github.com/skoobe/riofs.git").unwrap(),
            SourceKind::Git("https://github.com/skoobe/riofs.git".into())
        );
        assert_eq!(
            classify("git@github.com:skoobe/riofs.git").unwrap(),
            SourceKind::Git("git@github.com:skoobe/riofs.git".into())
        );
        assert_eq!(
            classify("file:///src/riofs").unwrap(),
            SourceKind::Local(PathBuf::from("/src/riofs"))
        );
        assert_eq!(
            classify("/src/riofs").unwrap(),
            SourceKind::Local(PathBuf::from("/src/riofs"))
        );
        assert!(classify("ftp://example.com/x").is_err());
        assert!(classify("riofs").is_err());
    }

    #[test]
    fn test_repo_name() {
        assert_eq!(repo_name("https://github.com/skoobe/riofs.git").unwrap(), "riofs");
        assert_eq!(repo_name("https://github.com/skoobe/riofs/").unwrap(), "riofs");
        assert_eq!(repo_name("git@github.com:skoobe/riofs.git").unwrap(), "riofs");
        assert!(repo_name("https://").is_err());
    }

    #[test]
    fn test_fetch_local_directory() {
        let dir = TempDir::new().unwrap();
        let source = Source {
            url: format!("file://{}", dir.path().display()),
            version: "1".into(),
        };
        let build = TempDir::new().unwrap();
        assert_eq!(fetch(&source, build.path()).unwrap(), dir.path());
    }

    #[test]
    fn test_fetch_missing_local_directory() {
        let dir = TempDir::new().unwrap();
        let source = Source {
            url: dir.path().join("gone").display().to_string(),
            version: "1".into(),
        };
        assert!(fetch(&source, dir.path()).is_err());
    }
}
