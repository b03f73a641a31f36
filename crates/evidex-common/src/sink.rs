//! Output sink interface.

use std::path::PathBuf;

use crate::assoc::EnrichedPair;
use crate::error::Result;

/// Where a sink put the rows and the co-occurrence scalar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputReceipt {
    pub rows_written: usize,
    pub assocs_path: Option<PathBuf>,
    pub common_diseases_path: Option<PathBuf>,
}

/// Serializes the enriched rows and, when present, the co-occurrence count.
///
/// The rows are written in the order they are given.
pub trait OutputSink: Send + Sync {
    fn write(&self, rows: &[EnrichedPair], common_diseases: Option<u64>) -> Result<OutputReceipt>;
}
