//! Provenance tracking
//!
//! Append-only record of which operator produced (or failed to produce)
//! each layer during a run. Observability only: nothing in the pipeline
//! reads it back to make decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::Layer;
use crate::operators::StepConfig;

/// Record of one step execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub layer: Layer,
    pub operator_id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: f64,
    pub ai_available: bool,
    /// Step config as passed to the operator
    pub config: StepConfig,
    pub success: bool,
    pub error: Option<String>,
}

impl ProvenanceEntry {
    pub fn success(
        layer: Layer,
        operator_id: &str,
        duration_ms: f64,
        ai_available: bool,
        config: StepConfig,
    ) -> Self {
        Self {
            layer,
            operator_id: operator_id.to_string(),
            timestamp: Utc::now(),
            duration_ms,
            ai_available,
            config,
            success: true,
            error: None,
        }
    }

    pub fn failure(
        layer: Layer,
        operator_id: &str,
        duration_ms: f64,
        ai_available: bool,
        config: StepConfig,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::success(layer, operator_id, duration_ms, ai_available, config)
        }
    }
}

/// Condensed view of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceSummary {
    pub run_id: String,
    pub total_steps: usize,
    pub total_duration_ms: f64,
    pub failed: Vec<Layer>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Tracks provenance for every step in one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceTracker {
    run_id: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    entries: Vec<ProvenanceEntry>,
}

impl ProvenanceTracker {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            completed_at: None,
            entries: Vec::new(),
        }
    }

    /// Append an entry
    pub fn record(&mut self, entry: ProvenanceEntry) {
        self.entries.push(entry);
    }

    /// Mark the run finished
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn entries(&self) -> &[ProvenanceEntry] {
        &self.entries
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn total_duration_ms(&self) -> f64 {
        self.entries.iter().map(|e| e.duration_ms).sum()
    }

    /// Layers whose step failed, in execution order
    pub fn failed_layers(&self) -> Vec<Layer> {
        self.entries
            .iter()
            .filter(|e| !e.success)
            .map(|e| e.layer)
            .collect()
    }

    pub fn summary(&self) -> ProvenanceSummary {
        ProvenanceSummary {
            run_id: self.run_id.clone(),
            total_steps: self.entries.len(),
            total_duration_ms: self.total_duration_ms(),
            failed: self.failed_layers(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}
