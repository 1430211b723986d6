//! Per-formula install lock
//!
//! One `<name>.lock` file per formula in the prefix's state directory. The
//! file is created once and never removed: the lock is the `flock` held on
//! it, not its existence. A crashed installer releases its lock with its
//! file descriptors, so there is no stale-lock cleanup.

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Path of the lock file for `name` in `state_dir`.
pub fn lock_path(state_dir: &Path, name: &str) -> PathBuf {
    state_dir.join(format!("{}.lock", name))
}

/// Take the install lock for `name`, or fail if another installer holds it.
///
/// The holder's pid is written into the file so the error can name it.
pub fn acquire_install_lock(state_dir: &Path, name: &str) -> Result<InstallLock> {
    std::fs::create_dir_all(state_dir)
        .with_context(|| format!("Failed to create state directory: {}", state_dir.display()))?;
    let path = lock_path(state_dir, name);

    // No truncate: the file may belong to the current holder.
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

    if file.try_lock_exclusive().is_err() {
        let mut holder = String::new();
        let _ = file.read_to_string(&mut holder);
        match holder.trim() {
            "" => bail!("Formula '{}' is already being installed by another process", name),
            pid => bail!("Formula '{}' is already being installed (pid {})", name, pid),
        }
    }

    file.set_len(0)
        .and_then(|_| file.seek(SeekFrom::Start(0)))
        .and_then(|_| writeln!(file, "{}", std::process::id()))
        .with_context(|| format!("Failed to write lock file: {}", path.display()))?;

    Ok(InstallLock { file, path })
}

/// Held install lock. Dropping it releases the lock and leaves the file.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = self.file.unlock();
    }
}
