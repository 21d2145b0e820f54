//! End-of-run bookkeeping for remote assets and local temp files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::provider::{AnalysisProvider, UploadedAsset};

/// Tracks everything that must be removed when the run ends.
#[derive(Debug, Default)]
pub struct CleanupLedger {
    assets: Vec<UploadedAsset>,
    files: Vec<PathBuf>,
    seen_files: HashSet<PathBuf>,
    dirs: Vec<PathBuf>,
}

/// What teardown managed to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub remote_deleted: Vec<String>,
    pub remote_failed: Vec<String>,
    pub local_deleted: usize,
    pub local_failed: usize,
    pub dirs_removed: usize,
}

impl CleanupReport {
    pub fn remote_attempted(&self) -> usize {
        self.remote_deleted.len() + self.remote_failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.remote_failed.is_empty() && self.local_failed == 0
    }
}

impl CleanupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the temp directories, purge stale files in them, and track them for removal.
    pub async fn prepare(dirs: &[PathBuf]) -> std::io::Result<Self> {
        let mut ledger = Self::new();
        for dir in dirs {
            fs::create_dir_all(dir).await?;
            let purged = purge_files(dir).await;
            if purged > 0 {
                debug!(dir = %dir.display(), purged, "Removed stale temp files");
            }
            ledger.track_dir(dir.clone());
        }
        Ok(ledger)
    }

    /// Record a successfully uploaded asset.
    pub fn track_asset(&mut self, asset: UploadedAsset) {
        self.assets.push(asset);
    }

    pub fn track_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.seen_files.insert(path.clone()) {
            self.files.push(path);
        }
    }

    pub fn track_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.dirs.contains(&dir) {
            self.dirs.push(dir);
        }
    }

    pub fn assets(&self) -> &[UploadedAsset] {
        &self.assets
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Best-effort teardown. Every entry is attempted once; failures are only logged.
    pub async fn cleanup<P>(self, provider: &P) -> CleanupReport
    where
        P: AnalysisProvider + ?Sized,
    {
        let mut report = CleanupReport::default();

        for asset in &self.assets {
            match provider.delete_file(asset).await {
                Ok(()) => report.remote_deleted.push(asset.name.clone()),
                Err(e) => {
                    warn!(asset = %asset.name, "Failed to delete remote file: {}", e);
                    report.remote_failed.push(asset.name.clone());
                }
            }
        }

        for path in &self.files {
            match fs::remove_file(path).await {
                Ok(()) => report.local_deleted += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Temp file already gone");
                }
                Err(e) => {
                    warn!(path = %path.display(), "Failed to delete temp file: {}", e);
                    report.local_failed += 1;
                }
            }
        }

        for dir in &self.dirs {
            let stray = purge_files(dir).await;
            if stray > 0 {
                debug!(dir = %dir.display(), stray, "Removed untracked temp files");
            }
            match fs::remove_dir(dir).await {
                Ok(()) => report.dirs_removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(dir = %dir.display(), "Failed to remove temp directory: {}", e),
            }
        }

        info!(
            remote_deleted = report.remote_deleted.len(),
            remote_failed = report.remote_failed.len(),
            local_deleted = report.local_deleted,
            local_failed = report.local_failed,
            "Cleanup finished"
        );
        report
    }
}

/// Remove the regular files directly inside `dir`; returns how many were removed.
async fn purge_files(dir: &Path) -> usize {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return 0,
    };
    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        match fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %entry.path().display(), "Failed to delete temp file: {}", e),
        }
    }
    removed
}
