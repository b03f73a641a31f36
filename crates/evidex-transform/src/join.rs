//! Metadata join: resolve target symbols and disease names for aggregated pairs.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use evidex_common::{
    DiseaseRecord, DuplicatePolicy, EnrichedPair, EvidexError, MetadataKind, Result, TargetRecord,
};
use tracing::{debug, warn};

use crate::aggregate::AggregatedPairs;

/// Lookup indices `targetId -> approvedSymbol` and `diseaseId -> name`.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    symbols: HashMap<String, String>,
    names: HashMap<String, String>,
}

/// Result of an inner join, with the number of pairs that found no metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutcome {
    pub rows: Vec<EnrichedPair>,
    /// Pairs whose target id is absent from target metadata.
    pub missing_target: usize,
    /// Pairs whose disease id is absent from disease metadata.
    pub missing_disease: usize,
    /// Pairs dropped for either reason (a pair missing both counts once).
    pub dropped: usize,
}

impl MetadataIndex {
    /// Build both indices. Under [`DuplicatePolicy::Fail`] a repeated id in
    /// either table is a `DuplicateKey` error.
    pub fn build(
        targets: &[TargetRecord],
        diseases: &[DiseaseRecord],
        policy: DuplicatePolicy,
    ) -> Result<Self> {
        let symbols = build_index(
            targets.iter().map(|t| (t.id.as_str(), t.approved_symbol.as_str())),
            MetadataKind::Target,
            policy,
        )?;
        let names = build_index(
            diseases.iter().map(|d| (d.id.as_str(), d.name.as_str())),
            MetadataKind::Disease,
            policy,
        )?;
        Ok(Self { symbols, names })
    }

    pub fn symbol(&self, target_id: &str) -> Option<&str> {
        self.symbols.get(target_id).map(String::as_str)
    }

    pub fn disease_name(&self, disease_id: &str) -> Option<&str> {
        self.names.get(disease_id).map(String::as_str)
    }

    /// Enrich every pair whose target and disease both resolve; drop the rest.
    pub fn join(&self, pairs: &AggregatedPairs) -> JoinOutcome {
        let mut outcome = JoinOutcome::default();

        for pair in pairs.values() {
            let symbol = self.symbol(&pair.target_id);
            let name = self.disease_name(&pair.disease_id);
            if symbol.is_none() {
                outcome.missing_target += 1;
            }
            if name.is_none() {
                outcome.missing_disease += 1;
            }
            match (symbol, name) {
                (Some(symbol), Some(name)) => outcome.rows.push(EnrichedPair {
                    pair: pair.clone(),
                    approved_symbol: symbol.to_string(),
                    name: name.to_string(),
                }),
                _ => outcome.dropped += 1,
            }
        }

        debug!(
            rows = outcome.rows.len(),
            dropped = outcome.dropped,
            missing_target = outcome.missing_target,
            missing_disease = outcome.missing_disease,
            "Joined association pairs with metadata"
        );
        outcome
    }
}

/// Build the indices and join in one call.
pub fn join(
    pairs: &AggregatedPairs,
    targets: &[TargetRecord],
    diseases: &[DiseaseRecord],
    policy: DuplicatePolicy,
) -> Result<JoinOutcome> {
    Ok(MetadataIndex::build(targets, diseases, policy)?.join(pairs))
}

fn build_index<'a>(
    entries: impl Iterator<Item = (&'a str, &'a str)>,
    kind: MetadataKind,
    policy: DuplicatePolicy,
) -> Result<HashMap<String, String>> {
    let mut index = HashMap::new();
    for (id, value) in entries {
        match index.entry(id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
            }
            Entry::Occupied(mut slot) => match policy {
                DuplicatePolicy::Fail => {
                    return Err(EvidexError::DuplicateKey { kind, id: id.to_string() });
                }
                DuplicatePolicy::LastWins => {
                    warn!(%kind, id, previous = %slot.get(), replacement = value, "Duplicate metadata id, keeping last");
                    slot.insert(value.to_string());
                }
            },
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use evidex_common::EvidenceRecord;

    fn pairs() -> AggregatedPairs {
        aggregate(&[
            EvidenceRecord::new("t1", "d1", 0.5),
            EvidenceRecord::new("t2", "d1", 0.4),
            EvidenceRecord::new("t3", "d9", 0.3),
        ])
    }

    fn targets() -> Vec<TargetRecord> {
        vec![TargetRecord::new("t1", "KRAS"), TargetRecord::new("t2", "TP53")]
    }

    fn diseases() -> Vec<DiseaseRecord> {
        vec![DiseaseRecord::new("d1", "pancreatic carcinoma")]
    }

    #[test]
    fn test_join_is_inner() {
        let out = join(&pairs(), &targets(), &diseases(), DuplicatePolicy::Fail).unwrap();
        assert_eq!(out.rows.len(), 2);
        assert!(out.rows.iter().all(|r| r.pair.target_id != "t3"));
        assert_eq!(out.dropped, 1);
        assert_eq!(out.missing_target, 1);
        assert_eq!(out.missing_disease, 1);
    }

    #[test]
    fn test_join_resolves_names() {
        let out = join(&pairs(), &targets(), &diseases(), DuplicatePolicy::Fail).unwrap();
        let kras = out.rows.iter().find(|r| r.pair.target_id == "t1").unwrap();
        assert_eq!(kras.approved_symbol, "KRAS");
        assert_eq!(kras.name, "pancreatic carcinoma");
    }

    #[test]
    fn test_missing_disease_only_is_dropped() {
        let out = join(&pairs(), &targets(), &[], DuplicatePolicy::Fail).unwrap();
        assert!(out.rows.is_empty());
        assert_eq!(out.dropped, 3);
        assert_eq!(out.missing_disease, 3);
        assert_eq!(out.missing_target, 1);
    }

    #[test]
    fn test_duplicate_target_fails_by_default() {
        let mut dup = targets();
        dup.push(TargetRecord::new("t1", "KRAS2"));
        let err = join(&pairs(), &dup, &diseases(), DuplicatePolicy::Fail).unwrap_err();
        match err {
            EvidexError::DuplicateKey { kind, id } => {
                assert_eq!(kind, MetadataKind::Target);
                assert_eq!(id, "t1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_disease_fails_by_default() {
        let mut dup = diseases();
        dup.push(DiseaseRecord::new("d1", "other"));
        let err = MetadataIndex::build(&targets(), &dup, DuplicatePolicy::Fail).unwrap_err();
        assert!(matches!(err, EvidexError::DuplicateKey { kind: MetadataKind::Disease, .. }));
    }

    #[test]
    fn test_duplicate_last_wins_when_chosen() {
        let mut dup = targets();
        dup.push(TargetRecord::new("t1", "KRAS2"));
        let index = MetadataIndex::build(&dup, &diseases(), DuplicatePolicy::LastWins).unwrap();
        assert_eq!(index.symbol("t1"), Some("KRAS2"));
    }

    #[test]
    fn test_join_empty_pairs() {
        let out = join(&AggregatedPairs::new(), &targets(), &diseases(), DuplicatePolicy::Fail).unwrap();
        assert_eq!(out, JoinOutcome::default());
    }
}
