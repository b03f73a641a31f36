//! evidex-transform: In-memory transform stage.
//!
//! Three steps, applied in order by the pipeline:
//! - [`aggregate`]: median and top-3 score per (target, disease) pair
//! - [`join`]: inner join of aggregated pairs with target and disease metadata
//! - [`cooccurrence`]: number of target pairs sharing qualifying diseases
//!
//! Every function here is pure over its inputs. The only parallelism is the
//! co-occurrence scan, which runs on its own fixed-size rayon pool.

pub mod aggregate;
pub mod join;
pub mod cooccurrence;

pub use aggregate::{aggregate, median, top_scores, AggregatedPairs};
pub use cooccurrence::{CoOccurrenceCounter, DiseaseSets, QualifyingAssociation};
pub use join::{join, JoinOutcome, MetadataIndex};
