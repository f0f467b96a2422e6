//! Targeted regeneration of weak layers
//!
//! After a compile, enabled layers scoring below a threshold are re-run
//! with the full current context and a `regeneration` flag, then the whole
//! artifact is rescored and one revision is appended.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, warn};

use super::conductor::{short_run_id, Conductor};
use super::plan::OperatorStep;
use super::provenance::ProvenanceTracker;
use crate::core::{score_artifact, Layer, LayerConfigs, Record};
use crate::operators::{StepConfig, REGENERATION_FLAG};

/// Layers scoring strictly below this are regenerated by default
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Re-run operators for enabled layers scoring below `threshold`.
///
/// Weak layers run in canonical order. Returns the layers that were
/// successfully regenerated; a record with no evaluation, or with no weak
/// layers, is left untouched.
pub fn regenerate_weak_layers(
    record: &mut Record,
    configs: &LayerConfigs,
    conductor: &Conductor,
    threshold: f64,
) -> Vec<Layer> {
    let Some(evaluation) = record.artifact.evaluation.as_ref() else {
        return Vec::new();
    };

    let weak_layers = select_weak_layers(&evaluation.layer_scores, configs, threshold);
    if weak_layers.is_empty() {
        info!("No weak layers to regenerate");
        return Vec::new();
    }

    let names: Vec<&str> = weak_layers.iter().map(|l| l.as_str()).collect();
    info!("Regenerating weak layers: {}", names.join(", "));
    let score_before = evaluation.overall_score;

    let mut config = StepConfig::new();
    config.insert(REGENERATION_FLAG.to_string(), Value::Bool(true));

    let steps: Vec<OperatorStep> = weak_layers
        .iter()
        .filter_map(|layer| match conductor.registry().get(*layer) {
            Ok(binding) => Some(OperatorStep {
                layer: *layer,
                operator_id: binding.operator_id.clone(),
                config: config.clone(),
                enabled: true,
                required: configs.get(layer).is_some_and(|c| c.required),
            }),
            Err(e) => {
                warn!("Skipping regeneration of {}: {}", layer, e);
                None
            }
        })
        .collect();

    let outcomes = conductor.run_steps(&steps, &mut record.artifact);

    let mut tracker = ProvenanceTracker::new(short_run_id());
    conductor.record_outcomes(&mut tracker, &steps, &outcomes);
    tracker.complete();
    record.provenance.push(tracker);

    let changed: Vec<Layer> = outcomes
        .iter()
        .filter(|o| o.is_success())
        .map(|o| o.layer)
        .collect();

    let evaluation = score_artifact(&record.artifact, configs);
    let score_after = evaluation.overall_score;
    record.artifact.evaluation = Some(evaluation);

    record.add_revision(
        changed.clone(),
        format!("Regenerated layers below threshold ({})", threshold),
        Some(score_before),
        Some(score_after),
    );
    info!(
        "Regeneration: score {:.3} -> {:.3}, {} layer(s) changed",
        score_before,
        score_after,
        changed.len()
    );

    changed
}

/// Enabled layers with a score below the threshold, in canonical order
fn select_weak_layers(
    layer_scores: &BTreeMap<Layer, f64>,
    configs: &LayerConfigs,
    threshold: f64,
) -> Vec<Layer> {
    layer_scores
        .iter()
        .filter(|(layer, score)| {
            **score < threshold && configs.get(layer).is_some_and(|c| c.enabled)
        })
        .map(|(layer, _)| *layer)
        .collect()
}
