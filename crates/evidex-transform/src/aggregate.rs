//! Per-pair score statistics.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use evidex_common::{AggregatedPair, AssociationKey, EvidenceRecord};
use tracing::debug;

/// Number of top scores kept per association pair.
pub const TOP_K: usize = 3;

/// Aggregated pairs keyed by (target, disease), in key order.
pub type AggregatedPairs = BTreeMap<AssociationKey, AggregatedPair>;

/// Group evidence by (target, disease) and compute the median and top-3 score
/// of each group.
///
/// Within a group, scores keep the order in which their records appear in
/// `evidence`; that order only matters for tie-breaking in the top-3.
pub fn aggregate(evidence: &[EvidenceRecord]) -> AggregatedPairs {
    let mut groups: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
    for record in evidence {
        groups
            .entry((record.target_id.as_str(), record.disease_id.as_str()))
            .or_default()
            .push(record.score);
    }

    let mut pairs = AggregatedPairs::new();
    for ((target_id, disease_id), scores) in groups {
        let Some(median) = median(&scores) else {
            continue;
        };
        let pair = AggregatedPair {
            target_id: target_id.to_string(),
            disease_id: disease_id.to_string(),
            median,
            top3: top_scores(&scores, TOP_K),
        };
        pairs.insert(pair.key(), pair);
    }

    debug!(records = evidence.len(), pairs = pairs.len(), "Aggregated evidence scores");
    pairs
}

/// Statistical median. Even-sized inputs average the two middle values.
/// Returns `None` for an empty slice.
pub fn median(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// The `k` highest scores, descending.
///
/// The sort is stable: scores that compare equal stay in input order.
pub fn top_scores(scores: &[f64], k: usize) -> Vec<f64> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    sorted.truncate(k);
    sorted
}
