//! Layer operators
//!
//! This module provides:
//! - `Operator` trait implemented by every layer operator
//! - `GenerationBackend` trait for the external content service
//! - Deterministic template operators used when no backend is available
//! - The static layer → operator registry

mod operator;
mod registry;
mod template;

pub use operator::{
    estimate_confidence, is_regeneration, parse_generated, GenerationBackend, Operator,
    StepConfig, REGENERATION_FLAG,
};
pub use registry::{OperatorBinding, OperatorFactory, OperatorRegistry};
pub use template::{template_id, TemplateOperator};
