//! Core data model
//!
//! - Canonical layers and their fixed order
//! - Audience profiles and the control-vector catalog
//! - Artifact / Record / Revision containers
//! - Weighted scoring

mod artifact;
mod audience;
mod layer;
mod scoring;

pub use artifact::{Artifact, Content, LayerContext, LayerOutput, Record, Revision};
pub use audience::{AudienceCatalog, AudienceProfile, ControlVector, Expertise};
pub use layer::Layer;
pub use scoring::{
    default_layer_configs, round4, score_artifact, EvaluationResult, LayerConfig, LayerConfigs,
    REQUIRED_PENALTY,
};

pub(crate) use audience::display_name;
pub(crate) use scoring::sanitize_weight;
