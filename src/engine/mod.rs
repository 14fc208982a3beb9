//! The analysis core: cost simulation, policy evaluation, and the
//! orchestrator that drives a request through the full pipeline.

pub mod orchestrator;
pub mod policy;
pub mod simulation;

pub use orchestrator::AnalysisOrchestrator;
pub use policy::{build_evaluation_context, PolicyEngine};
pub use simulation::simulate_cost;
