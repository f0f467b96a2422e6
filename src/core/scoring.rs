//! Weighted scoring for artifacts
//!
//! score = Σ(w·c) / Σ(w) over enabled layers, where an enabled but empty
//! layer contributes confidence 0. Disabled layers are excluded from both
//! sums. Any enabled, required, empty layer multiplies the result by
//! `REQUIRED_PENALTY`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::artifact::Artifact;
use super::layer::Layer;

/// Multiplier applied when a required layer is missing
pub const REQUIRED_PENALTY: f64 = 0.7;

/// Per-layer toggle: `{enabled, required, weight}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLayerConfig")]
pub struct LayerConfig {
    pub enabled: bool,
    pub required: bool,
    /// Always >= 0; only set through `new`
    weight: f64,
}

/// Wire form; every deserialized config goes through `LayerConfig::new`
#[derive(Deserialize)]
struct RawLayerConfig {
    enabled: bool,
    required: bool,
    weight: f64,
}

impl From<RawLayerConfig> for LayerConfig {
    fn from(raw: RawLayerConfig) -> Self {
        Self::new(raw.enabled, raw.required, raw.weight)
    }
}

impl LayerConfig {
    /// Build a config; negative or non-finite weights become 0
    pub fn new(enabled: bool, required: bool, weight: f64) -> Self {
        Self {
            enabled,
            required,
            weight: sanitize_weight(weight),
        }
    }

    /// Enabled, not required, weight 1.0
    pub fn enabled() -> Self {
        Self::new(true, false, 1.0)
    }

    /// Disabled, not required, weight 1.0
    pub fn disabled() -> Self {
        Self::new(false, false, 1.0)
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self::enabled()
    }
}

/// Full toggle configuration: one entry per configured layer
pub type LayerConfigs = BTreeMap<Layer, LayerConfig>;

/// Every canonical layer enabled, not required, weight 1.0
pub fn default_layer_configs() -> LayerConfigs {
    Layer::ALL.iter().map(|l| (*l, LayerConfig::enabled())).collect()
}

pub(crate) fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// Scoring result, replaced wholesale on every (re)score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub overall_score: f64,
    pub layer_scores: BTreeMap<Layer, f64>,
    pub penalty_applied: bool,
    pub penalty_reason: Option<String>,
    pub missing_required: Vec<Layer>,
    pub weights_used: BTreeMap<Layer, f64>,
}

/// Score an artifact against a toggle configuration.
///
/// Layers absent from `configs` are treated as disabled. Pure and
/// deterministic.
pub fn score_artifact(artifact: &Artifact, configs: &LayerConfigs) -> EvaluationResult {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut layer_scores = BTreeMap::new();
    let mut weights_used = BTreeMap::new();
    let mut missing_required = Vec::new();

    for layer in Layer::ALL {
        let config = match configs.get(&layer) {
            Some(config) if config.enabled => config,
            _ => continue,
        };

        weights_used.insert(layer, config.weight);
        denominator += config.weight;

        match artifact.layer(layer) {
            Some(output) => {
                layer_scores.insert(layer, output.confidence());
                numerator += config.weight * output.confidence();
            }
            None => {
                layer_scores.insert(layer, 0.0);
                if config.required {
                    missing_required.push(layer);
                }
            }
        }
    }

    let mut overall = if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    };

    let mut penalty_reason = None;
    if !missing_required.is_empty() {
        let names: Vec<&str> = missing_required.iter().map(|l| l.as_str()).collect();
        penalty_reason = Some(format!("Missing required layers: {}", names.join(", ")));
        overall *= REQUIRED_PENALTY;
    }

    EvaluationResult {
        overall_score: round4(overall),
        layer_scores,
        penalty_applied: penalty_reason.is_some(),
        penalty_reason,
        missing_required,
        weights_used,
    }
}

/// Round to 4 decimal places, halves to even
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round_ties_even() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifact::{Content, LayerOutput};
    use crate::core::audience::{AudienceProfile, ControlVector, Expertise};
    use approx::assert_abs_diff_eq;

    fn make_artifact(layers: &[(Layer, f64)]) -> Artifact {
        let audience = AudienceProfile::new("test", Expertise::Intermediate, ControlVector::MIDPOINT);
        let mut artifact = Artifact::new("test", audience);
        for (layer, confidence) in layers {
            let mut content = Content::new();
            content.insert("data".into(), serde_json::json!("test"));
            artifact.set_layer(LayerOutput::new(*layer, content, *confidence));
        }
        artifact
    }

    fn configs(entries: &[(Layer, LayerConfig)]) -> LayerConfigs {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_empty_artifact() {
        let artifact = make_artifact(&[]);
        let result = score_artifact(&artifact, &configs(&[(Layer::Activation, LayerConfig::enabled())]));
        assert_eq!(result.overall_score, 0.0);
        assert!(!result.penalty_applied);
        assert_eq!(result.layer_scores[&Layer::Activation], 0.0);
    }

    #[test]
    fn test_no_enabled_layers() {
        let artifact = make_artifact(&[(Layer::Activation, 0.9)]);
        let result = score_artifact(&artifact, &configs(&[(Layer::Activation, LayerConfig::disabled())]));
        assert_eq!(result.overall_score, 0.0);
        assert!(result.layer_scores.is_empty());
    }

    #[test]
    fn test_weighted_average() {
        let artifact = make_artifact(&[(Layer::Activation, 0.8), (Layer::Metaphor, 0.6)]);
        let cfg = configs(&[
            (Layer::Activation, LayerConfig::new(true, false, 2.0)),
            (Layer::Metaphor, LayerConfig::new(true, false, 1.0)),
        ]);
        let result = score_artifact(&artifact, &cfg);
        // (2.0*0.8 + 1.0*0.6) / 3.0
        assert_eq!(result.overall_score, 0.7333);
        assert_eq!(result.weights_used[&Layer::Activation], 2.0);
    }

    #[test]
    fn test_disabled_layers_excluded() {
        let artifact = make_artifact(&[(Layer::Activation, 0.8), (Layer::Metaphor, 0.2)]);
        let cfg = configs(&[
            (Layer::Activation, LayerConfig::enabled()),
            (Layer::Metaphor, LayerConfig::disabled()),
        ]);
        let result = score_artifact(&artifact, &cfg);
        assert_eq!(result.overall_score, 0.8);
        assert!(!result.layer_scores.contains_key(&Layer::Metaphor));
        assert!(!result.weights_used.contains_key(&Layer::Metaphor));
    }

    #[test]
    fn test_layers_absent_from_configs_ignored() {
        let artifact = make_artifact(&[(Layer::Activation, 0.4), (Layer::Transfer, 1.0)]);
        let result = score_artifact(&artifact, &configs(&[(Layer::Activation, LayerConfig::enabled())]));
        assert_eq!(result.overall_score, 0.4);
        assert_eq!(result.layer_scores.len(), 1);
    }

    #[test]
    fn test_unpopulated_optional_layer_dilutes_silently() {
        let artifact = make_artifact(&[(Layer::Activation, 0.9)]);
        let cfg = configs(&[
            (Layer::Activation, LayerConfig::enabled()),
            (Layer::Metaphor, LayerConfig::enabled()),
        ]);
        let result = score_artifact(&artifact, &cfg);
        assert_eq!(result.overall_score, 0.45);
        assert!(!result.penalty_applied);
        assert!(result.missing_required.is_empty());
    }

    #[test]
    fn test_missing_required_penalty() {
        let artifact = make_artifact(&[(Layer::Activation, 0.8)]);
        let cfg = configs(&[
            (Layer::Activation, LayerConfig::enabled()),
            (Layer::Structure, LayerConfig::new(true, true, 1.0)),
        ]);
        let result = score_artifact(&artifact, &cfg);

        assert!(result.penalty_applied);
        assert_eq!(result.missing_required, vec![Layer::Structure]);
        assert_eq!(
            result.penalty_reason.as_deref(),
            Some("Missing required layers: structure")
        );
        assert_abs_diff_eq!(result.overall_score, round4(0.4 * REQUIRED_PENALTY));
    }

    #[test]
    fn test_disabled_required_layer_no_penalty() {
        let artifact = make_artifact(&[(Layer::Activation, 0.8)]);
        let cfg = configs(&[
            (Layer::Activation, LayerConfig::enabled()),
            (Layer::Structure, LayerConfig::new(false, true, 1.0)),
        ]);
        let result = score_artifact(&artifact, &cfg);
        assert!(!result.penalty_applied);
        assert_eq!(result.overall_score, 0.8);
    }

    #[test]
    fn test_rounding() {
        let artifact = make_artifact(&[
            (Layer::Activation, 0.3),
            (Layer::Metaphor, 0.5),
            (Layer::Structure, 0.7),
        ]);
        let cfg = configs(&[
            (Layer::Activation, LayerConfig::new(true, false, 1.0)),
            (Layer::Metaphor, LayerConfig::new(true, false, 1.0)),
            (Layer::Structure, LayerConfig::new(true, false, 1.0)),
        ]);
        let weighted: f64 = 0.3 + 0.5 + 0.7;
        assert_eq!(score_artifact(&artifact, &cfg).overall_score, round4(weighted / 3.0));
    }

    #[test]
    fn test_zero_weight_layer() {
        let artifact = make_artifact(&[(Layer::Activation, 0.2)]);
        let cfg = configs(&[(Layer::Activation, LayerConfig::new(true, false, 0.0))]);
        let result = score_artifact(&artifact, &cfg);
        assert_eq!(result.overall_score, 0.0);
        assert_eq!(result.layer_scores[&Layer::Activation], 0.2);
    }

    #[test]
    fn test_weight_sanitized() {
        assert_eq!(LayerConfig::new(true, false, -3.0).weight(), 0.0);
        assert_eq!(LayerConfig::new(true, false, f64::INFINITY).weight(), 0.0);
        assert_eq!(LayerConfig::new(true, false, 2.5).weight(), 2.5);
    }

    #[test]
    fn test_deserialized_weight_sanitized() {
        let config: LayerConfig =
            serde_json::from_str(r#"{"enabled": true, "required": false, "weight": -5.0}"#).unwrap();
        assert_eq!(config.weight(), 0.0);
        assert!(config.enabled);
    }

    #[test]
    fn test_negative_weight_keeps_score_in_range() {
        let artifact = make_artifact(&[(Layer::Activation, 0.1), (Layer::Metaphor, 0.9)]);
        let cfg: LayerConfigs = serde_json::from_str(
            r#"{
                "activation": {"enabled": true, "required": false, "weight": 2.0},
                "metaphor": {"enabled": true, "required": false, "weight": -1.0}
            }"#,
        )
        .unwrap();

        let result = score_artifact(&artifact, &cfg);

        assert!((0.0..=1.0).contains(&result.overall_score));
        assert_eq!(result.overall_score, 0.1);
        assert_eq!(result.weights_used[&Layer::Metaphor], 0.0);
    }

    #[test]
    fn test_round4_halves_to_even() {
        assert_eq!(round4(0.03125), 0.0312);
        assert_eq!(round4(0.12345678), 0.1235);

        let artifact = make_artifact(&[(Layer::Activation, 0.03125)]);
        let cfg = configs(&[(Layer::Activation, LayerConfig::enabled())]);
        assert_eq!(score_artifact(&artifact, &cfg).overall_score, 0.0312);
    }
}
