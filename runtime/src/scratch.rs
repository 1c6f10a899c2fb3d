//! Scratch directories: one private tree per run, plus startup cleanup.

use std::io;
use std::path::{Path, PathBuf};

/// Extensions of downloaded exports.
pub const EXPORT_EXTENSIONS: [&str; 2] = ["xls", "xlsx"];
/// Extensions of diagnostics artifacts.
pub const DIAGNOSTIC_EXTENSIONS: [&str; 2] = ["png", "html"];

/// Directories owned by a single run. Never shared between runs.
#[derive(Debug, Clone)]
pub struct RunDirs {
    pub root: PathBuf,
    pub downloads: PathBuf,
    pub profile: PathBuf,
}

impl RunDirs {
    /// Create a fresh, uniquely named run tree under `runs_dir`.
    pub fn create(runs_dir: &Path) -> io::Result<Self> {
        let root = runs_dir.join(uuid::Uuid::new_v4().to_string());
        let dirs = Self {
            downloads: root.join("downloads"),
            profile: root.join("profile"),
            root,
        };
        std::fs::create_dir_all(&dirs.downloads)?;
        std::fs::create_dir_all(&dirs.profile)?;
        Ok(dirs)
    }

    /// Remove the whole run tree.
    pub fn remove(&self) -> io::Result<()> {
        match std::fs::remove_dir_all(&self.root) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Delete files in `dir` whose extension is in `extensions` (case-insensitive).
///
/// A missing directory is not an error. Returns the number of files removed;
/// individual failures are logged and skipped.
pub fn clear_files(dir: &Path, extensions: &[&str]) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || !has_extension(&path, extensions) {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("cannot remove {}: {e}", path.display()),
        }
    }
    removed
}

/// Remove leftovers of earlier processes: every run tree and stray exports
/// under `runs_dir`, and diagnostics files in `screenshots_dir`.
///
/// Only safe before any run of this process has started.
pub fn sweep_stale(runs_dir: &Path, screenshots_dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(runs_dir)?;
    std::fs::create_dir_all(screenshots_dir)?;

    let mut trees = 0;
    for entry in std::fs::read_dir(runs_dir)?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            match std::fs::remove_dir_all(&path) {
                Ok(()) => trees += 1,
                Err(e) => tracing::warn!("cannot remove {}: {e}", path.display()),
            }
        }
    }
    let exports = clear_files(runs_dir, &EXPORT_EXTENSIONS);
    let shots = clear_files(screenshots_dir, &DIAGNOSTIC_EXTENSIONS);
    tracing::info!("swept {trees} stale runs, {exports} exports, {shots} diagnostics files");
    Ok(())
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
