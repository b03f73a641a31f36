//! evidex-common: Shared record types, errors, and the adapter traits used across all evidex crates.

pub mod error;
pub mod records;
pub mod assoc;
pub mod source;
pub mod sink;

// Re-export commonly used types
pub use error::{EvidexError, Result};
pub use records::{DiseaseRecord, EvidenceRecord, MetadataKind, TargetRecord, TypedRecord};
pub use assoc::{AggregatedPair, AssociationKey, DuplicatePolicy, EnrichedPair};
pub use source::{load_typed, Record, RecordSource};
pub use sink::{OutputReceipt, OutputSink};
