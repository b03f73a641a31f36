//! Download-then-transform driver.

use std::sync::Arc;

use evidex_common::{EvidexError, Result};
use evidex_config::Config;
use evidex_ingestion::{connect, fetch_datasets, BatchDownloader, DatasetDirs, JsonDirectorySource};
use tracing::{info, instrument};

use crate::output::JsonFileSink;
use crate::pipeline::{Pipeline, PipelineSettings, RunSummary};

/// Fetch the three datasets into `storage.data_dir` (unless `skip_download`)
/// and run the association pipeline over them.
///
/// The transform steps are CPU bound and run on the blocking pool.
#[instrument(skip(config), fields(server = %config.server.url, workers = config.transform.workers))]
pub async fn run_pipeline(config: &Config, skip_download: bool) -> Result<RunSummary> {
    config.validate()?;
    let data_dir = config.storage.data_dir.clone();
    let workers = config.transform.workers;

    if skip_download {
        info!(data_dir = %data_dir.display(), "Skipping download, using local datasets");
    } else {
        let server = connect(&config.server.url)?;
        let downloader = BatchDownloader::new(server, workers);
        let dirs = DatasetDirs {
            evidence: config.server.evidence_dir.clone(),
            targets: config.server.target_dir.clone(),
            diseases: config.server.disease_dir.clone(),
        };
        let downloaded = fetch_datasets(&downloader, &dirs, &data_dir).await?;
        info!(files = downloaded.files, bytes = downloaded.bytes, "Datasets downloaded");
    }

    let source = Arc::new(JsonDirectorySource::new(data_dir, workers));
    let sink = Arc::new(JsonFileSink::from_config(&config.output));
    let settings = PipelineSettings::from_config(&config.transform);

    tokio::task::spawn_blocking(move || Pipeline::new(source, sink, settings).run())
        .await
        .map_err(|e| EvidexError::WorkerFailure(format!("pipeline task failed: {e}")))?
}
