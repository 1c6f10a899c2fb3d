//! Detection of export files arriving in the download directory.
//!
//! A download is "the export" only if it was absent from the snapshot taken
//! before the export click and carries a spreadsheet extension. Chromium
//! writes in-progress downloads under a temporary suffix, so a matching
//! name means the file is complete.

use crate::scratch::{has_extension, EXPORT_EXTENSIONS};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File names present in a directory at one moment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirSnapshot {
    names: BTreeSet<OsString>,
}

impl DirSnapshot {
    /// Snapshot `dir`. A missing directory is an empty snapshot.
    pub fn take(dir: &Path) -> io::Result<Self> {
        let mut names = BTreeSet::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self { names }),
            Err(e) => return Err(e),
        };
        for entry in entries {
            names.insert(entry?.file_name());
        }
        Ok(Self { names })
    }

    /// Names in `later` that are not in `self`, in sorted order.
    pub fn added_in<'a>(&'a self, later: &'a DirSnapshot) -> impl Iterator<Item = &'a OsString> {
        later.names.difference(&self.names)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A download directory armed with its pre-export snapshot.
#[derive(Debug)]
pub struct DownloadWatch {
    dir: PathBuf,
    before: DirSnapshot,
}

impl DownloadWatch {
    pub fn arm(dir: &Path) -> io::Result<Self> {
        Ok(Self {
            dir: dir.to_path_buf(),
            before: DirSnapshot::take(dir)?,
        })
    }

    /// Completed exports that appeared since arming.
    pub fn new_exports(&self) -> io::Result<Vec<PathBuf>> {
        let now = DirSnapshot::take(&self.dir)?;
        Ok(self
            .before
            .added_in(&now)
            .map(|name| self.dir.join(name))
            .filter(|path| has_extension(path, &EXPORT_EXTENSIONS))
            .collect())
    }

    /// Poll up to `polls` times, `interval` apart, for a new export.
    pub async fn await_export(&self, polls: u32, interval: Duration) -> io::Result<Option<PathBuf>> {
        for poll in 0..polls {
            if poll > 0 {
                tokio::time::sleep(interval).await;
            }
            let mut found = self.new_exports()?;
            if let Some(path) = found.pop() {
                if !found.is_empty() {
                    debug!("{} exports appeared, using {}", found.len() + 1, path.display());
                }
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}
