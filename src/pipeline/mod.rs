//! Run orchestration.

pub mod orchestrator;
pub mod order;

pub use orchestrator::{
    PipelineOrchestrator, PipelineSettings, RunPhase, RunReport, RunStatus,
};
pub use order::DiscoveryOrder;
