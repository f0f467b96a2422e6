//! Integration Tests
//!
//! End-to-end compile, scoring and regeneration through the public API.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use scaffold::core::{
    round4, AudienceProfile, LayerContext, Layer, LayerConfig, LayerOutput, REQUIRED_PENALTY,
};
use scaffold::operators::{Operator, OperatorRegistry, StepConfig};
use scaffold::orchestrator::{LayerOverride, LayerOverrides};
use scaffold::{Conductor, Result, ScaffoldError};

fn profiles_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("profiles")
}

struct BrokenStructure;

impl Operator for BrokenStructure {
    fn id(&self) -> &str {
        "broken_structure"
    }

    fn layer(&self) -> Layer {
        Layer::Structure
    }

    fn execute(
        &self,
        _topic: &str,
        _audience: &AudienceProfile,
        _context: &LayerContext,
        _config: &StepConfig,
    ) -> Result<LayerOutput> {
        Err(ScaffoldError::operator_failed(
            Layer::Structure,
            "broken_structure",
            "outline service unreachable",
        ))
    }
}

// === Compile Tests ===

#[test]
fn test_compile_with_checked_in_profile() {
    let conductor = Conductor::new(profiles_dir());
    let record = conductor
        .compile("ancillary services", "child", "chatbot_tutor", None, None)
        .unwrap();

    assert_eq!(record.artifact.topic(), "ancillary services");
    assert_eq!(record.profile_name, "chatbot_tutor");
    assert!(record.profile_checksum.is_some());
    let evaluation = record.artifact.evaluation.as_ref().unwrap();
    assert!(evaluation.overall_score > 0.0);
    assert!(!evaluation.penalty_applied);
}

#[test]
fn test_disabled_layers_excluded_from_scores() {
    let conductor = Conductor::new(profiles_dir());
    let record = conductor
        .compile("neural networks", "data_scientist", "rag_explainer", None, None)
        .unwrap();
    let evaluation = record.artifact.evaluation.as_ref().unwrap();

    for layer in [Layer::Activation, Layer::Interrogation, Layer::Reflection] {
        assert!(!evaluation.layer_scores.contains_key(&layer));
        assert!(!evaluation.weights_used.contains_key(&layer));
        assert!(!record.artifact.is_populated(layer));
    }
}

#[test]
fn test_weighted_average_matches_confidences() {
    let conductor = Conductor::new(profiles_dir());
    let configs = conductor.resolve_configs("chatbot_tutor", None);
    let record = conductor
        .compile("entropy", "general", "chatbot_tutor", None, None)
        .unwrap();

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (layer, config) in &configs {
        let confidence = record.artifact.layer(*layer).unwrap().confidence();
        numerator += config.weight() * confidence;
        denominator += config.weight();
    }
    assert_abs_diff_eq!(
        record.overall_score(),
        round4(numerator / denominator),
        epsilon = 1e-12
    );
}

#[test]
fn test_runtime_overrides_leave_only_structure() {
    let conductor = Conductor::new(profiles_dir());
    let mut overrides = LayerOverrides::new();
    for layer in [
        Layer::Activation,
        Layer::Metaphor,
        Layer::Interrogation,
        Layer::Encoding,
        Layer::Transfer,
        Layer::Reflection,
        Layer::Synthesis,
    ] {
        overrides.insert(layer, LayerOverride::enabled(false));
    }

    let record = conductor
        .compile("test", "general", "chatbot_tutor", Some(&overrides), None)
        .unwrap();

    assert_eq!(record.artifact.populated_layers(), vec![Layer::Structure]);
}

#[test]
fn test_compile_is_deterministic() {
    let conductor = Conductor::new(profiles_dir());
    let a = conductor
        .compile("transformers", "general", "etl_explain", None, None)
        .unwrap();
    let b = conductor
        .compile("transformers", "general", "etl_explain", None, None)
        .unwrap();

    assert_eq!(a.overall_score(), b.overall_score());
    assert_eq!(a.artifact.populated_layers(), b.artifact.populated_layers());
    assert_ne!(a.record_id, b.record_id);
}

#[test]
fn test_missing_profile_uses_defaults() {
    let conductor = Conductor::new(profiles_dir());
    let record = conductor
        .compile("entropy", "general", "no_such_profile", None, None)
        .unwrap();

    assert_eq!(record.artifact.populated_layers(), Layer::ALL.to_vec());
    assert!(record.profile_checksum.is_none());
}

#[test]
fn test_required_layer_failure_penalised() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("seven.yaml"),
        "layers:\n  structure: {required: true}\n  synthesis: {enabled: false}\n",
    )
    .unwrap();

    let mut registry = OperatorRegistry::with_defaults();
    registry.bind(Layer::Structure, "broken_structure", |_| {
        Arc::new(BrokenStructure) as Arc<dyn Operator>
    });
    let conductor = Conductor::new(dir.path()).with_registry(registry);

    let configs = conductor.resolve_configs("seven", None);
    assert_eq!(configs[&Layer::Structure], LayerConfig::new(true, true, 1.0));

    let record = conductor
        .compile("entropy", "general", "seven", None, None)
        .unwrap();
    let evaluation = record.artifact.evaluation.as_ref().unwrap();

    assert!(evaluation.penalty_applied);
    assert_eq!(evaluation.missing_required, vec![Layer::Structure]);
    assert_eq!(
        evaluation.penalty_reason.as_deref(),
        Some("Missing required layers: structure")
    );
    assert_eq!(evaluation.layer_scores[&Layer::Structure], 0.0);

    let others: f64 = record.artifact.outputs().map(|o| o.confidence()).sum();
    assert_eq!(record.artifact.populated_layers().len(), 6);
    assert_abs_diff_eq!(
        evaluation.overall_score,
        round4(others / 7.0 * REQUIRED_PENALTY),
        epsilon = 1e-12
    );
    assert_eq!(record.provenance[0].failed_layers(), vec![Layer::Structure]);
}

#[test]
fn test_unbound_layer_aborts_compile() {
    let mut registry = OperatorRegistry::with_defaults();
    registry.unbind(Layer::Metaphor);
    let conductor = Conductor::new(profiles_dir()).with_registry(registry);

    let err = conductor
        .compile("entropy", "general", "chatbot_tutor", None, None)
        .unwrap_err();
    assert_eq!(err.error_code(), "UNBOUND_LAYER");
    assert!(!err.is_recoverable());
}

// === Regeneration Tests ===

#[test]
fn test_regenerate_everything_below_one() {
    let conductor = Conductor::new(profiles_dir());
    let configs = conductor.resolve_configs("chatbot_tutor", None);
    let mut record = conductor
        .compile("entropy", "general", "chatbot_tutor", None, None)
        .unwrap();
    assert!(record
        .artifact
        .outputs()
        .all(|o| o.confidence() < 1.0));
    let revision_before = record.current_revision();

    let changed = conductor.regenerate(&mut record, &configs, 1.0);

    assert_eq!(changed, Layer::ALL.to_vec());
    assert_eq!(record.current_revision(), revision_before + 1);
    assert_eq!(record.revision_history().len(), 2);
    let revision = record.latest_revision().unwrap();
    assert_eq!(revision.changed_layers, Layer::ALL.to_vec());
    assert_eq!(revision.reason, "Regenerated layers below threshold (1)");
    assert!(record
        .artifact
        .outputs()
        .all(|o| o.content().contains_key("elaboration")));
}

#[test]
fn test_regeneration_keeps_record_serializable() {
    let conductor = Conductor::new(profiles_dir());
    let configs = conductor.resolve_configs("chatbot_tutor", None);
    let mut record = conductor
        .compile("entropy", "child", "chatbot_tutor", None, None)
        .unwrap();
    conductor.regenerate(&mut record, &configs, 1.0);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["provenance"].as_array().unwrap().len(), 2);
    assert_eq!(json["revision_history"].as_array().unwrap().len(), 2);
}
