//! Output files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use evidex_common::{EnrichedPair, OutputReceipt, OutputSink, Result};
use evidex_config::OutputConfig;
use tracing::info;

/// Writes the rows as one JSON array and the co-occurrence count as decimal text.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
    assocs_file: String,
    common_diseases_file: String,
}

impl JsonFileSink {
    pub fn new(
        dir: impl Into<PathBuf>,
        assocs_file: impl Into<String>,
        common_diseases_file: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            assocs_file: assocs_file.into(),
            common_diseases_file: common_diseases_file.into(),
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(&output.dir, &output.assocs_file, &output.common_diseases_file)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for JsonFileSink {
    fn write(&self, rows: &[EnrichedPair], common_diseases: Option<u64>) -> Result<OutputReceipt> {
        std::fs::create_dir_all(&self.dir)?;

        let assocs_path = self.dir.join(&self.assocs_file);
        let mut out = BufWriter::new(File::create(&assocs_path)?);
        serde_json::to_writer(&mut out, rows)?;
        out.flush()?;
        info!(path = %assocs_path.display(), rows = rows.len(), "Wrote associations");

        let common_diseases_path = match common_diseases {
            Some(count) => {
                let path = self.dir.join(&self.common_diseases_file);
                std::fs::write(&path, format!("{count}\n"))?;
                info!(path = %path.display(), count, "Wrote common disease count");
                Some(path)
            }
            None => None,
        };

        Ok(OutputReceipt {
            rows_written: rows.len(),
            assocs_path: Some(assocs_path),
            common_diseases_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evidex_common::AggregatedPair;
    use serde_json::{json, Value};

    fn row() -> EnrichedPair {
        EnrichedPair {
            pair: AggregatedPair {
                target_id: "target2".into(),
                disease_id: "disease2".into(),
                median: 15.0,
                top3: vec![15.0],
            },
            approved_symbol: "symbol2".into(),
            name: "diseaseName2".into(),
        }
    }

    #[test]
    fn test_writes_flat_records_and_count() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(tmp.path().join("out"), "assocs.json", "common_diseases.txt");

        let receipt = sink.write(&[row()], Some(3)).unwrap();

        let assocs_path = receipt.assocs_path.unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(assocs_path).unwrap()).unwrap();
        assert_eq!(
            written,
            json!([{
                "targetId": "target2",
                "diseaseId": "disease2",
                "median": 15.0,
                "top3": [15.0],
                "approvedSymbol": "symbol2",
                "name": "diseaseName2"
            }])
        );
        let count = std::fs::read_to_string(receipt.common_diseases_path.unwrap()).unwrap();
        assert_eq!(count.trim(), "3");
        assert_eq!(receipt.rows_written, 1);
    }

    #[test]
    fn test_no_count_file_without_count() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(tmp.path(), "a.json", "c.txt");

        let receipt = sink.write(&[], None).unwrap();

        assert!(receipt.common_diseases_path.is_none());
        assert!(!tmp.path().join("c.txt").exists());
        assert_eq!(std::fs::read_to_string(tmp.path().join("a.json")).unwrap(), "[]");
    }
}
