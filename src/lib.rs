//! Scaffold - layered content compiler
//!
//! Compiles an explanation of a topic for a given audience by running a
//! fixed pipeline of layer operators, each contributing one layer
//! (activation, metaphor, structure, ...). Layers are toggled per profile,
//! scored with a weighted average, and compared with A/B experiments.
//!
//! # Architecture
//!
//! - `core`: layers, audiences, artifacts and scoring
//! - `operators`: the operator capability and its static registry
//! - `orchestrator`: toggles, call plans, the conductor, provenance,
//!   regeneration and experiments
//! - `adapters`: chat, retrieval and warehouse views of a compiled record

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod operators;
pub mod orchestrator;

pub use config::ScaffoldConfig;
pub use error::{Result, ScaffoldError};
pub use orchestrator::{Conductor, ExperimentConfig, ExperimentRunner};
