//! Parallel download of whole remote directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use evidex_common::{DiseaseRecord, EvidenceRecord, Result, TargetRecord, TypedRecord};
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{info, instrument};

use crate::sources::FileServer;

/// What one directory download moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub files: usize,
    pub bytes: u64,
}

impl DownloadSummary {
    fn merge(self, other: Self) -> Self {
        Self {
            files: self.files + other.files,
            bytes: self.bytes + other.bytes,
        }
    }
}

/// Downloads every file of a remote directory with at most `workers`
/// transfers in flight.
pub struct BatchDownloader {
    server: Arc<dyn FileServer>,
    workers: usize,
}

impl BatchDownloader {
    pub fn new(server: Arc<dyn FileServer>, workers: usize) -> Self {
        Self {
            server,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Copy every file in `remote_dir` into `local_dir`, creating it if needed.
    ///
    /// The first failed transfer aborts the batch; transfers still in flight
    /// are dropped and the error is returned.
    #[instrument(skip(self, local_dir), fields(server = %self.server.address(), workers = self.workers))]
    pub async fn download_dir(&self, remote_dir: &str, local_dir: &Path) -> Result<DownloadSummary> {
        tokio::fs::create_dir_all(local_dir).await?;

        let files = self.server.list_dir(remote_dir).await?;
        info!(remote_dir, files = files.len(), "Listed remote directory");

        let sizes: Vec<u64> = stream::iter(files.iter())
            .map(|name| self.server.download_file(remote_dir, name, local_dir))
            .buffer_unordered(self.workers)
            .try_collect()
            .await?;

        let summary = DownloadSummary {
            files: sizes.len(),
            bytes: sizes.iter().sum(),
        };
        info!(remote_dir, files = summary.files, bytes = summary.bytes, "Directory downloaded");
        Ok(summary)
    }
}

/// Remote directories of the three datasets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDirs {
    pub evidence: String,
    pub targets: String,
    pub diseases: String,
}

/// Download all three datasets into `<data_dir>/<dataset>/`.
///
/// The local directory names match the dataset names the record loaders ask
/// for, so the result can be read back by a `JsonDirectorySource` rooted at
/// `data_dir`.
pub async fn fetch_datasets(
    downloader: &BatchDownloader,
    dirs: &DatasetDirs,
    data_dir: &Path,
) -> Result<DownloadSummary> {
    let plan: [(&str, &str); 3] = [
        (EvidenceRecord::DATASET, dirs.evidence.as_str()),
        (TargetRecord::DATASET, dirs.targets.as_str()),
        (DiseaseRecord::DATASET, dirs.diseases.as_str()),
    ];

    let mut total = DownloadSummary::default();
    for (dataset, remote_dir) in plan {
        let local: PathBuf = data_dir.join(dataset);
        let summary = downloader.download_dir(remote_dir, &local).await?;
        total = total.merge(summary);
    }
    Ok(total)
}
