//! Shared testing utilities: the canonical fixture and in-memory adapters.

use std::collections::HashMap;
use std::sync::Mutex;

use evidex_common::{
    DiseaseRecord, EnrichedPair, EvidenceRecord, EvidexError, OutputReceipt, OutputSink, Record,
    RecordSource, Result, TargetRecord, TypedRecord,
};
use serde::Serialize;
use serde_json::Value;

/// The two-target, two-disease dataset used across the workspace tests.
pub mod fixtures {
    use super::*;

    pub fn evidence() -> Vec<EvidenceRecord> {
        vec![
            EvidenceRecord::new("target1", "disease1", 3.0),
            EvidenceRecord::new("target1", "disease1", 6.0),
            EvidenceRecord::new("target1", "disease1", 7.0),
            EvidenceRecord::new("target1", "disease1", 11.0),
            EvidenceRecord::new("target2", "disease2", 15.0),
        ]
    }

    pub fn targets() -> Vec<TargetRecord> {
        vec![
            TargetRecord::new("target1", "symbol1"),
            TargetRecord::new("target2", "symbol2"),
        ]
    }

    pub fn diseases() -> Vec<DiseaseRecord> {
        vec![
            DiseaseRecord::new("disease1", "diseaseName1"),
            DiseaseRecord::new("disease2", "diseaseName2"),
        ]
    }

    /// A source serving the fixture under the standard dataset names.
    pub fn source() -> MemorySource {
        MemorySource::new()
            .with_records(&evidence())
            .with_records(&targets())
            .with_records(&diseases())
    }
}

/// A [`RecordSource`] backed by JSON values held in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    datasets: HashMap<String, Vec<Value>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add raw JSON rows to a dataset.
    pub fn with_rows(mut self, dataset: &str, rows: Vec<Value>) -> Self {
        self.datasets.entry(dataset.to_string()).or_default().extend(rows);
        self
    }

    /// Add typed records under their own dataset name.
    pub fn with_records<T: TypedRecord + Serialize>(self, records: &[T]) -> Self {
        let rows = records
            .iter()
            .map(|r| serde_json::to_value(r).expect("fixture record serializes"))
            .collect();
        self.with_rows(T::DATASET, rows)
    }
}

impl RecordSource for MemorySource {
    fn load(&self, dataset: &str, fields: &[&str]) -> Result<Vec<Record>> {
        let rows = self
            .datasets
            .get(dataset)
            .ok_or_else(|| EvidexError::DatasetNotFound(dataset.into()))?;

        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let location = format!("{dataset} row {}", i + 1);
                let object = row.as_object().ok_or_else(|| EvidexError::Decode {
                    location: location.clone(),
                    message: "not a JSON object".to_string(),
                })?;
                let mut record = Record::new(location.clone());
                for field in fields {
                    let value = object.get(*field).ok_or_else(|| EvidexError::MissingField {
                        location: location.clone(),
                        field: field.to_string(),
                    })?;
                    record.insert(*field, value.clone());
                }
                Ok(record)
            })
            .collect()
    }
}

/// An [`OutputSink`] that keeps what it was given.
#[derive(Debug, Default)]
pub struct MemorySink {
    written: Mutex<Vec<(Vec<EnrichedPair>, Option<u64>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows and scalar of the most recent write.
    pub fn last(&self) -> Option<(Vec<EnrichedPair>, Option<u64>)> {
        self.written.lock().ok()?.last().cloned()
    }

    pub fn writes(&self) -> usize {
        self.written.lock().map(|w| w.len()).unwrap_or(0)
    }
}

impl OutputSink for MemorySink {
    fn write(&self, rows: &[EnrichedPair], common_diseases: Option<u64>) -> Result<OutputReceipt> {
        let mut written = self
            .written
            .lock()
            .map_err(|_| EvidexError::WorkerFailure("memory sink lock poisoned".to_string()))?;
        written.push((rows.to_vec(), common_diseases));
        Ok(OutputReceipt {
            rows_written: rows.len(),
            assocs_path: None,
            common_diseases_path: None,
        })
    }
}
