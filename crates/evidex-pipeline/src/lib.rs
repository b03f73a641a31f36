//! evidex-pipeline: Running the association ETL end to end.
//! - Step-wise orchestrator with an explicit run state
//! - JSON / text output files
//! - Download + transform driver used by the `evidex` binary

pub mod output;
pub mod pipeline;
pub mod run;

pub use output::JsonFileSink;
pub use pipeline::{Pipeline, PipelineSettings, PipelineState, RunSummary};
pub use run::run_pipeline;
