/// Raw record types as they arrive from the evidence repository.
/// Field names follow the upstream JSON schema.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A record type that can be projected out of a named dataset.
///
/// `DATASET` is the dataset name understood by a [`crate::RecordSource`], and
/// `FIELDS` the exact set of fields the record needs; every other field of the
/// raw line is discarded during decoding.
pub trait TypedRecord: DeserializeOwned + Send {
    const DATASET: &'static str;
    const FIELDS: &'static [&'static str];
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

/// A single scored observation linking one target to one disease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    pub target_id: String,
    pub disease_id: String,
    pub score: f64,
}

impl EvidenceRecord {
    pub fn new(target_id: impl Into<String>, disease_id: impl Into<String>, score: f64) -> Self {
        Self {
            target_id: target_id.into(),
            disease_id: disease_id.into(),
            score,
        }
    }
}

impl TypedRecord for EvidenceRecord {
    const DATASET: &'static str = "evidence";
    const FIELDS: &'static [&'static str] = &["targetId", "diseaseId", "score"];
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRecord {
    pub id: String,
    pub approved_symbol: String, // e.g. KRAS
}

impl TargetRecord {
    pub fn new(id: impl Into<String>, approved_symbol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            approved_symbol: approved_symbol.into(),
        }
    }
}

impl TypedRecord for TargetRecord {
    const DATASET: &'static str = "targets";
    const FIELDS: &'static [&'static str] = &["id", "approvedSymbol"];
}

// ---------------------------------------------------------------------------
// Disease
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    pub id: String,   // e.g. EFO_0000305
    pub name: String,
}

impl DiseaseRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl TypedRecord for DiseaseRecord {
    const DATASET: &'static str = "diseases";
    const FIELDS: &'static [&'static str] = &["id", "name"];
}

/// Which metadata table an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Target,
    Disease,
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataKind::Target => f.write_str("target"),
            MetadataKind::Disease => f.write_str("disease"),
        }
    }
}
