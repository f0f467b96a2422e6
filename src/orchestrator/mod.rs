//! Compilation orchestration
//!
//! This module provides:
//! - Toggle resolution (profiles, overrides, experiment variants)
//! - Call plans bound through the operator registry
//! - The conductor's compile loop with per-step failure isolation
//! - Provenance tracking, weak-layer regeneration and A/B experiments

mod conductor;
mod experiment;
mod plan;
pub mod provenance;
mod regeneration;
mod toggles;

pub use conductor::{Conductor, StepOutcome};
pub use experiment::{
    ExperimentConfig, ExperimentReport, ExperimentRunner, ExperimentSummary, LayerDelta,
    LayerExperimentResult, VariantResult,
};
pub use plan::{CallPlan, OperatorStep};
pub use provenance::{ProvenanceEntry, ProvenanceSummary, ProvenanceTracker};
pub use regeneration::{regenerate_weak_layers, DEFAULT_THRESHOLD};
pub use toggles::{configs_to_overrides, LayerOverride, LayerOverrides, ToggleManager};
