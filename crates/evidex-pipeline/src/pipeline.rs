//! Association ETL orchestrator.
//!
//! Runs one dataset through the fixed sequence
//!   1. Extract evidence, targets and diseases from a `RecordSource`
//!   2. Aggregate evidence scores per (target, disease) pair
//!   3. Join the pairs with target symbols and disease names
//!   4. Count target pairs sharing qualifying diseases
//!   5. Save the sorted rows and the count to an `OutputSink`
//!
//! Each step is a separate call and may only follow the step before it. Any
//! error leaves the state where it was and stops the run.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use evidex_common::{
    load_typed, DiseaseRecord, DuplicatePolicy, EnrichedPair, EvidenceRecord, EvidexError,
    OutputReceipt, OutputSink, RecordSource, Result, TargetRecord,
};
use evidex_config::TransformConfig;
use evidex_transform::{
    aggregate, AggregatedPairs, CoOccurrenceCounter, DiseaseSets, MetadataIndex,
    QualifyingAssociation,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

// ── Run state ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Extracted,
    Aggregated,
    Joined,
    Counted,
    Saved,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Extracted => "extracted",
            PipelineState::Aggregated => "aggregated",
            PipelineState::Joined => "joined",
            PipelineState::Counted => "counted",
            PipelineState::Saved => "saved",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub workers: usize,
    pub min_shared: usize,
    pub qualifying: QualifyingAssociation,
    pub duplicates: DuplicatePolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&TransformConfig::default())
    }
}

impl PipelineSettings {
    pub fn from_config(transform: &TransformConfig) -> Self {
        Self {
            workers: transform.workers,
            min_shared: transform.min_shared_diseases,
            qualifying: QualifyingAssociation::new(transform.qualifying_median_above),
            duplicates: transform.duplicate_metadata,
        }
    }
}

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub evidence_records: usize,
    pub target_records: usize,
    pub disease_records: usize,
    pub aggregated_pairs: usize,
    pub joined_rows: usize,
    pub missing_target: usize,
    pub missing_disease: usize,
    pub dropped: usize,
    pub common_diseases: u64,
    pub rows_written: usize,
    pub assocs_path: Option<std::path::PathBuf>,
    pub common_diseases_path: Option<std::path::PathBuf>,
    pub duration_ms: u64,
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

/// Holds the dataset state of one run.
pub struct Pipeline {
    source: Arc<dyn RecordSource>,
    sink: Arc<dyn OutputSink>,
    settings: PipelineSettings,
    state: PipelineState,
    run_id: Uuid,
    started_at: DateTime<Utc>,

    evidence: Vec<EvidenceRecord>,
    targets: Vec<TargetRecord>,
    diseases: Vec<DiseaseRecord>,
    pairs: AggregatedPairs,
    rows: Vec<EnrichedPair>,
    missing_target: usize,
    missing_disease: usize,
    dropped: usize,
    common_diseases: Option<u64>,
    receipt: Option<OutputReceipt>,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn RecordSource>,
        sink: Arc<dyn OutputSink>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            sink,
            settings,
            state: PipelineState::Idle,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            evidence: Vec::new(),
            targets: Vec::new(),
            diseases: Vec::new(),
            pairs: AggregatedPairs::new(),
            rows: Vec::new(),
            missing_target: 0,
            missing_disease: 0,
            dropped: 0,
            common_diseases: None,
            receipt: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn pairs(&self) -> &AggregatedPairs {
        &self.pairs
    }

    pub fn rows(&self) -> &[EnrichedPair] {
        &self.rows
    }

    pub fn common_diseases(&self) -> Option<u64> {
        self.common_diseases
    }

    fn expect_state(&self, from: PipelineState, to: PipelineState) -> Result<()> {
        if self.state == from {
            Ok(())
        } else {
            Err(EvidexError::InvalidTransition {
                from: self.state.as_str(),
                to: to.as_str(),
            })
        }
    }

    /// Idle -> Extracted.
    pub fn extract(&mut self) -> Result<()> {
        self.expect_state(PipelineState::Idle, PipelineState::Extracted)?;

        let source = self.source.as_ref();
        let evidence = load_typed::<EvidenceRecord>(source)?;
        let targets = load_typed::<TargetRecord>(source)?;
        let diseases = load_typed::<DiseaseRecord>(source)?;
        info!(
            run_id = %self.run_id,
            evidence = evidence.len(),
            targets = targets.len(),
            diseases = diseases.len(),
            "Extracted datasets"
        );

        self.evidence = evidence;
        self.targets = targets;
        self.diseases = diseases;
        self.state = PipelineState::Extracted;
        Ok(())
    }

    /// Extracted -> Aggregated.
    pub fn aggregate(&mut self) -> Result<()> {
        self.expect_state(PipelineState::Extracted, PipelineState::Aggregated)?;

        self.pairs = aggregate(&self.evidence);
        info!(run_id = %self.run_id, pairs = self.pairs.len(), "Aggregated evidence scores");
        self.state = PipelineState::Aggregated;
        Ok(())
    }

    /// Aggregated -> Joined. Pairs without metadata are dropped and counted.
    pub fn join(&mut self) -> Result<()> {
        self.expect_state(PipelineState::Aggregated, PipelineState::Joined)?;

        let index = MetadataIndex::build(&self.targets, &self.diseases, self.settings.duplicates)?;
        let outcome = index.join(&self.pairs);
        if outcome.dropped > 0 {
            warn!(
                run_id = %self.run_id,
                dropped = outcome.dropped,
                missing_target = outcome.missing_target,
                missing_disease = outcome.missing_disease,
                "Pairs without metadata were dropped"
            );
        }
        info!(run_id = %self.run_id, rows = outcome.rows.len(), "Joined metadata");

        self.rows = outcome.rows;
        self.missing_target = outcome.missing_target;
        self.missing_disease = outcome.missing_disease;
        self.dropped = outcome.dropped;
        self.state = PipelineState::Joined;
        Ok(())
    }

    /// Joined -> Counted.
    ///
    /// Qualifying associations are taken from the joined rows; every distinct
    /// evidence target takes part in the pair scan.
    pub fn count(&mut self) -> Result<()> {
        self.expect_state(PipelineState::Joined, PipelineState::Counted)?;

        let qualifying = self.settings.qualifying;
        let universe: BTreeSet<&str> = self.evidence.iter().map(|e| e.target_id.as_str()).collect();
        let sets = DiseaseSets::from_associations(
            self.rows
                .iter()
                .filter(|row| qualifying.qualifies(&row.pair))
                .map(|row| (row.pair.target_id.as_str(), row.pair.disease_id.as_str())),
            universe,
        );

        let counter = CoOccurrenceCounter::new(self.settings.workers, self.settings.min_shared);
        let count = counter.count(&sets)?;

        self.common_diseases = Some(count);
        self.state = PipelineState::Counted;
        Ok(())
    }

    /// Counted -> Saved. Rows are written by ascending median, ties by key.
    pub fn save(&mut self) -> Result<()> {
        self.expect_state(PipelineState::Counted, PipelineState::Saved)?;

        self.rows.sort_by(compare_rows);
        let receipt = self.sink.write(&self.rows, self.common_diseases)?;
        info!(run_id = %self.run_id, rows = receipt.rows_written, "Saved output");

        self.receipt = Some(receipt);
        self.state = PipelineState::Saved;
        Ok(())
    }

    /// Drive every remaining step from Idle and summarise the run.
    pub fn run(&mut self) -> Result<RunSummary> {
        let t0 = Instant::now();
        info!(run_id = %self.run_id, workers = self.settings.workers, "Starting association pipeline");

        self.extract()?;
        self.aggregate()?;
        self.join()?;
        self.count()?;
        self.save()?;

        let summary = self.summary(t0.elapsed().as_millis() as u64);
        info!(
            run_id = %summary.run_id,
            rows = summary.rows_written,
            common_diseases = summary.common_diseases,
            duration_ms = summary.duration_ms,
            "Association pipeline finished"
        );
        Ok(summary)
    }

    fn summary(&self, duration_ms: u64) -> RunSummary {
        let receipt = self.receipt.clone().unwrap_or_default();
        RunSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            evidence_records: self.evidence.len(),
            target_records: self.targets.len(),
            disease_records: self.diseases.len(),
            aggregated_pairs: self.pairs.len(),
            joined_rows: self.rows.len(),
            missing_target: self.missing_target,
            missing_disease: self.missing_disease,
            dropped: self.dropped,
            common_diseases: self.common_diseases.unwrap_or(0),
            rows_written: receipt.rows_written,
            assocs_path: receipt.assocs_path,
            common_diseases_path: receipt.common_diseases_path,
            duration_ms,
        }
    }
}

fn compare_rows(a: &EnrichedPair, b: &EnrichedPair) -> Ordering {
    a.pair
        .median
        .total_cmp(&b.pair.median)
        .then_with(|| a.pair.target_id.cmp(&b.pair.target_id))
        .then_with(|| a.pair.disease_id.cmp(&b.pair.disease_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use evidex_common::AggregatedPair;

    fn row(target: &str, disease: &str, median: f64) -> EnrichedPair {
        EnrichedPair {
            pair: AggregatedPair {
                target_id: target.into(),
                disease_id: disease.into(),
                median,
                top3: vec![median],
            },
            approved_symbol: String::new(),
            name: String::new(),
        }
    }

    #[test]
    fn test_rows_sort_by_median_then_key() {
        let mut rows = vec![row("b", "d1", 2.0), row("a", "d2", 1.0), row("a", "d1", 2.0)];
        rows.sort_by(compare_rows);
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.pair.target_id.as_str(), r.pair.disease_id.as_str()))
            .collect();
        assert_eq!(keys, vec![("a", "d2"), ("a", "d1"), ("b", "d1")]);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(PipelineState::Idle.to_string(), "idle");
        assert_eq!(PipelineState::Counted.as_str(), "counted");
    }

    #[test]
    fn test_settings_follow_transform_config() {
        let config = TransformConfig {
            workers: 6,
            min_shared_diseases: 3,
            qualifying_median_above: 0.25,
            duplicate_metadata: DuplicatePolicy::LastWins,
        };
        let settings = PipelineSettings::from_config(&config);
        assert_eq!(settings.workers, 6);
        assert_eq!(settings.min_shared, 3);
        assert_eq!(settings.qualifying, QualifyingAssociation::new(0.25));
        assert_eq!(settings.duplicates, DuplicatePolicy::LastWins);
    }
}
