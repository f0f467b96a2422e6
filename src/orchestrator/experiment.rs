//! A/B layer experiments
//!
//! Compiles a baseline, then for each toggled layer compiles an
//! enabled/disabled variant pair and reports the score delta. Variants
//! run sequentially and share no state beyond the conductor.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::conductor::{short_run_id, Conductor};
use super::toggles::{configs_to_overrides, LayerOverrides};
use crate::core::{round4, ControlVector, Layer, Record};
use crate::error::{Result, ScaffoldError};

/// What to compile and which layers to A/B test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub topic: String,
    pub audience_id: String,
    pub profile_name: String,
    /// Layers to toggle, in report order
    pub toggle_layers: Vec<Layer>,
    #[serde(default)]
    pub audience_vector: Option<ControlVector>,
    /// Compiles per variant; scores are averaged
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
}

fn default_repetitions() -> u32 {
    1
}

impl ExperimentConfig {
    pub fn new(
        topic: &str,
        audience_id: &str,
        profile_name: &str,
        toggle_layers: Vec<Layer>,
    ) -> Self {
        Self {
            topic: topic.to_string(),
            audience_id: audience_id.to_string(),
            profile_name: profile_name.to_string(),
            toggle_layers,
            audience_vector: None,
            repetitions: default_repetitions(),
        }
    }

    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_audience_vector(mut self, vector: ControlVector) -> Self {
        self.audience_vector = Some(vector);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.repetitions == 0 {
            return Err(ScaffoldError::InvalidExperiment {
                reason: "repetitions must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Outcome of one variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantResult {
    /// "<layer>_enabled" or "<layer>_disabled"
    pub variant_name: String,
    pub toggle_state: BTreeMap<Layer, bool>,
    /// Last record compiled for this variant
    pub record: Record,
    pub score: f64,
    pub layer_scores: BTreeMap<Layer, f64>,
    pub populated_layers: Vec<Layer>,
}

impl VariantResult {
    fn new(layer: Layer, enabled: bool, record: Record, score: f64) -> Self {
        let suffix = if enabled { "enabled" } else { "disabled" };
        let layer_scores = record
            .artifact
            .evaluation
            .as_ref()
            .map(|e| e.layer_scores.clone())
            .unwrap_or_default();
        let populated_layers = record.artifact.populated_layers();

        Self {
            variant_name: format!("{}_{}", layer, suffix),
            toggle_state: BTreeMap::from([(layer, enabled)]),
            record,
            score,
            layer_scores,
            populated_layers,
        }
    }
}

/// A/B comparison for one toggled layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerExperimentResult {
    pub layer: Layer,
    pub enabled_score: f64,
    pub disabled_score: f64,
    /// Enabled minus disabled; may be negative
    pub score_delta: f64,
    pub enabled_result: VariantResult,
    pub disabled_result: VariantResult,
}

/// Full experiment output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub experiment_id: String,
    pub config: ExperimentConfig,
    pub baseline_score: f64,
    pub baseline_record: Record,
    pub layer_results: Vec<LayerExperimentResult>,
    pub timestamp: DateTime<Utc>,
    pub total_duration_ms: f64,
}

/// One entry of a summary's delta list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDelta {
    pub layer: Layer,
    pub delta: f64,
}

/// Concise view of an experiment report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub experiment_id: String,
    pub baseline_score: f64,
    pub layer_deltas: Vec<LayerDelta>,
    pub best_layer: Option<Layer>,
    pub worst_layer: Option<Layer>,
    pub total_duration_ms: f64,
}

impl ExperimentReport {
    /// Deltas in report order plus the layers with the largest and
    /// smallest delta (first one wins on ties)
    pub fn summary(&self) -> ExperimentSummary {
        let layer_deltas: Vec<LayerDelta> = self
            .layer_results
            .iter()
            .map(|r| LayerDelta {
                layer: r.layer,
                delta: r.score_delta,
            })
            .collect();

        let best_layer = first_extreme(&layer_deltas, |candidate, current| candidate > current);
        let worst_layer = first_extreme(&layer_deltas, |candidate, current| candidate < current);

        ExperimentSummary {
            experiment_id: self.experiment_id.clone(),
            baseline_score: self.baseline_score,
            layer_deltas,
            best_layer,
            worst_layer,
            total_duration_ms: self.total_duration_ms,
        }
    }

    /// Result for a layer, if it was toggled
    pub fn result_for(&self, layer: Layer) -> Option<&LayerExperimentResult> {
        self.layer_results.iter().find(|r| r.layer == layer)
    }
}

/// Strict comparison keeps the earliest entry among equals
fn first_extreme(deltas: &[LayerDelta], better: impl Fn(f64, f64) -> bool) -> Option<Layer> {
    deltas
        .iter()
        .fold(None::<&LayerDelta>, |best, d| match best {
            Some(b) if !better(d.delta, b.delta) => Some(b),
            _ => Some(d),
        })
        .map(|d| d.layer)
}

/// Runs A/B experiments against a conductor
pub struct ExperimentRunner<'a> {
    conductor: &'a Conductor,
}

impl<'a> ExperimentRunner<'a> {
    pub fn new(conductor: &'a Conductor) -> Self {
        Self { conductor }
    }

    /// Run the baseline and every variant pair.
    ///
    /// Per-layer failures stay inside each compile; plan errors abort the
    /// whole run.
    pub fn run(&self, config: &ExperimentConfig) -> Result<ExperimentReport> {
        config.validate()?;
        let start = Instant::now();
        let experiment_id = short_run_id();
        let names: Vec<&str> = config.toggle_layers.iter().map(|l| l.as_str()).collect();
        info!("[{}] Starting experiment: [{}]", experiment_id, names.join(", "));

        let (baseline_record, baseline_score) = self.compile_averaged(config, None)?;
        info!("[{}] Baseline score: {:.4}", experiment_id, baseline_score);

        let base_configs = self.conductor.toggles().load_profile(&config.profile_name);
        let mut layer_results = Vec::with_capacity(config.toggle_layers.len());

        for &layer in &config.toggle_layers {
            let (enabled_configs, disabled_configs) = self
                .conductor
                .toggles()
                .create_experiment_variants(&base_configs, layer);

            let (record_a, score_a) =
                self.compile_averaged(config, Some(&configs_to_overrides(&enabled_configs)))?;
            let (record_b, score_b) =
                self.compile_averaged(config, Some(&configs_to_overrides(&disabled_configs)))?;

            let result = LayerExperimentResult {
                layer,
                enabled_score: score_a,
                disabled_score: score_b,
                score_delta: round4(score_a - score_b),
                enabled_result: VariantResult::new(layer, true, record_a, score_a),
                disabled_result: VariantResult::new(layer, false, record_b, score_b),
            };
            info!(
                "[{}] {}: enabled={:.4}, disabled={:.4}, delta={:+.4}",
                experiment_id, layer, score_a, score_b, result.score_delta
            );
            layer_results.push(result);
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        Ok(ExperimentReport {
            experiment_id,
            config: config.clone(),
            baseline_score,
            baseline_record,
            layer_results,
            timestamp: Utc::now(),
            total_duration_ms: (elapsed_ms * 10.0).round() / 10.0,
        })
    }

    /// Compile `repetitions` times; returns the last record and the mean score
    fn compile_averaged(
        &self,
        config: &ExperimentConfig,
        overrides: Option<&LayerOverrides>,
    ) -> Result<(Record, f64)> {
        let mut total = 0.0;
        let mut last = None;

        for _ in 0..config.repetitions {
            let record = self.conductor.compile(
                &config.topic,
                &config.audience_id,
                &config.profile_name,
                overrides,
                config.audience_vector,
            )?;
            total += record.overall_score();
            last = Some(record);
        }

        let record = last.ok_or_else(|| ScaffoldError::InvalidExperiment {
            reason: "repetitions must be at least 1".to_string(),
        })?;
        Ok((record, round4(total / f64::from(config.repetitions))))
    }
}
