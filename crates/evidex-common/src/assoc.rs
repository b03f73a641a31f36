//! Derived association types produced by the transform stage.

use serde::{Deserialize, Serialize};

/// Composite (target, disease) grouping key.
///
/// Ordering is lexicographic on target then disease, which gives the
/// aggregated mapping a deterministic iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationKey {
    pub target_id: String,
    pub disease_id: String,
}

impl AssociationKey {
    pub fn new(target_id: impl Into<String>, disease_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            disease_id: disease_id.into(),
        }
    }
}

/// Summary statistics for one association pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPair {
    pub target_id: String,
    pub disease_id: String,
    pub median: f64,
    /// Highest scores of the group, descending, at most three.
    pub top3: Vec<f64>,
}

impl AggregatedPair {
    pub fn key(&self) -> AssociationKey {
        AssociationKey::new(&self.target_id, &self.disease_id)
    }
}

/// An aggregated pair with its target symbol and disease name resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedPair {
    #[serde(flatten)]
    pub pair: AggregatedPair,
    pub approved_symbol: String,
    pub name: String,
}

/// What to do when metadata contains two records with the same id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Reject the metadata with a `DuplicateKey` error.
    #[default]
    Fail,
    /// Keep the record that appears last in the source.
    LastWins,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enriched_pair_serializes_flat() {
        let row = EnrichedPair {
            pair: AggregatedPair {
                target_id: "target1".to_string(),
                disease_id: "disease1".to_string(),
                median: 6.5,
                top3: vec![11.0, 7.0, 6.0],
            },
            approved_symbol: "symbol1".to_string(),
            name: "diseaseName1".to_string(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["targetId"], "target1");
        assert_eq!(json["median"], 6.5);
        assert_eq!(json["top3"][0], 11.0);
        assert_eq!(json["approvedSymbol"], "symbol1");
        assert_eq!(json["name"], "diseaseName1");
        assert!(json.get("pair").is_none());
    }

    #[test]
    fn test_duplicate_policy_names() {
        let p: DuplicatePolicy = serde_json::from_str("\"last_wins\"").unwrap();
        assert_eq!(p, DuplicatePolicy::LastWins);
        assert_eq!(DuplicatePolicy::default(), DuplicatePolicy::Fail);
    }

    #[test]
    fn test_key_orders_by_target_then_disease() {
        assert!(AssociationKey::new("a", "z") < AssociationKey::new("b", "a"));
        assert!(AssociationKey::new("a", "a") < AssociationKey::new("a", "b"));
    }
}
