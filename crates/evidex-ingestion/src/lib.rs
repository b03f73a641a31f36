//! evidex-ingestion: Getting evidence data onto local disk and into memory.
//! - Remote file servers (FTP, HTTPS mirrors of the same tree)
//! - Parallel directory download
//! - Line-delimited JSON dataset decoding

pub mod sources;
pub mod download;
pub mod json_source;

pub use download::{fetch_datasets, BatchDownloader, DatasetDirs, DownloadSummary};
pub use json_source::JsonDirectorySource;
pub use sources::{connect, FileServer};
