//! Conductor: the compilation loop
//!
//! Resolves the audience and toggles, builds a call plan, runs every
//! enabled step in canonical order while accumulating context, then
//! scores the artifact and wraps it in a record.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tracing::{debug, error, info};
use uuid::Uuid;

use super::plan::{CallPlan, OperatorStep};
use super::provenance::{ProvenanceEntry, ProvenanceTracker};
use super::regeneration::regenerate_weak_layers;
use super::toggles::{LayerOverrides, ToggleManager};
use crate::core::{
    score_artifact, Artifact, AudienceCatalog, ControlVector, Layer, LayerConfigs, LayerOutput,
    Record,
};
use crate::error::{Result, ScaffoldError};
use crate::operators::{GenerationBackend, Operator, OperatorRegistry};

/// Result of one executed step. Failures are kept, not raised.
#[derive(Debug)]
pub struct StepOutcome {
    pub layer: Layer,
    pub operator_id: String,
    pub duration_ms: f64,
    pub result: Result<LayerOutput>,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Provenance entry describing this outcome
    pub fn provenance(&self, step: &OperatorStep, ai_available: bool) -> ProvenanceEntry {
        match &self.result {
            Ok(_) => ProvenanceEntry::success(
                self.layer,
                &self.operator_id,
                self.duration_ms,
                ai_available,
                step.config.clone(),
            ),
            Err(e) => ProvenanceEntry::failure(
                self.layer,
                &self.operator_id,
                self.duration_ms,
                ai_available,
                step.config.clone(),
                e.to_string(),
            ),
        }
    }
}

/// Main orchestrator that compiles artifacts
pub struct Conductor {
    toggles: ToggleManager,
    registry: OperatorRegistry,
    audiences: AudienceCatalog,
    backend: Option<Arc<dyn GenerationBackend>>,
    operators: [OnceLock<Arc<dyn Operator>>; Layer::COUNT],
}

impl Conductor {
    /// Conductor with template operators, the built-in audience table and
    /// no generation backend
    pub fn new(profiles_dir: impl Into<PathBuf>) -> Self {
        Self {
            toggles: ToggleManager::new(profiles_dir),
            registry: OperatorRegistry::with_defaults(),
            audiences: AudienceCatalog::with_defaults(),
            backend: None,
            operators: empty_cache(),
        }
    }

    pub fn with_registry(mut self, registry: OperatorRegistry) -> Self {
        self.registry = registry;
        self.operators = empty_cache();
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self.operators = empty_cache();
        self
    }

    pub fn with_audiences(mut self, audiences: AudienceCatalog) -> Self {
        self.audiences = audiences;
        self
    }

    pub fn toggles(&self) -> &ToggleManager {
        &self.toggles
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn audiences(&self) -> &AudienceCatalog {
        &self.audiences
    }

    /// Whether a generation backend is configured and reachable
    pub fn backend_available(&self) -> bool {
        self.backend.as_ref().is_some_and(|b| b.is_available())
    }

    /// Profile configs with runtime overrides applied
    pub fn resolve_configs(
        &self,
        profile_name: &str,
        overrides: Option<&LayerOverrides>,
    ) -> LayerConfigs {
        let base = self.toggles.load_profile(profile_name);
        match overrides {
            Some(o) if !o.is_empty() => self.toggles.apply_overrides(&base, o),
            _ => base,
        }
    }

    /// Compile an artifact for a topic and audience.
    ///
    /// Per-layer failures leave the slot empty and are recorded in
    /// provenance. Only plan construction errors are returned.
    pub fn compile(
        &self,
        topic: &str,
        audience_id: &str,
        profile_name: &str,
        overrides: Option<&LayerOverrides>,
        audience_vector: Option<ControlVector>,
    ) -> Result<Record> {
        let run_id = short_run_id();
        info!(
            "[{}] Compiling: topic='{}', audience='{}', profile='{}'",
            run_id, topic, audience_id, profile_name
        );

        let audience = self.audiences.resolve(audience_id, audience_vector);
        let configs = self.resolve_configs(profile_name, overrides);
        let plan = CallPlan::from_layer_configs(&configs, profile_name, &self.registry)?;

        let mut artifact = Artifact::new(topic, audience);
        let outcomes = self.run_plan(&plan, &mut artifact);

        let mut tracker = ProvenanceTracker::new(run_id.clone());
        self.record_outcomes(&mut tracker, plan.steps(), &outcomes);
        tracker.complete();

        let evaluation = score_artifact(&artifact, &configs);
        let score = evaluation.overall_score;
        artifact.evaluation = Some(evaluation);

        let populated = artifact.populated_layers();
        let layer_count = populated.len();
        let mut record = Record::new(artifact, profile_name);
        record.profile_checksum = self.toggles.profile_checksum(profile_name);
        record.provenance.push(tracker);
        record.add_revision(populated, "Initial compilation", None, Some(score));

        info!("[{}] Done: score={:.3}, layers={}", run_id, score, layer_count);
        Ok(record)
    }

    /// Execute every enabled step of a plan against an artifact
    pub fn run_plan(&self, plan: &CallPlan, artifact: &mut Artifact) -> Vec<StepOutcome> {
        self.run_steps(plan.enabled_steps(), artifact)
    }

    /// Execute steps in order, starting from the artifact's current context.
    ///
    /// Each successful output is stored in its slot and appended to the
    /// context seen by later steps.
    pub(crate) fn run_steps<'a>(
        &self,
        steps: impl IntoIterator<Item = &'a OperatorStep>,
        artifact: &mut Artifact,
    ) -> Vec<StepOutcome> {
        let topic = artifact.topic().to_string();
        let audience = artifact.audience().clone();
        let mut context = artifact.context();
        let mut outcomes = Vec::new();

        for step in steps {
            let start = Instant::now();
            let result = self.operator_for(step.layer).and_then(|op| {
                let output = op.execute(&topic, &audience, &context, &step.config)?;
                if output.layer() != step.layer {
                    return Err(ScaffoldError::operator_failed(
                        step.layer,
                        op.id(),
                        format!("produced output for layer '{}'", output.layer()),
                    ));
                }
                Ok(output)
            });
            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

            match &result {
                Ok(output) => {
                    info!("{}: confidence={:.2}", step.layer, output.confidence());
                    context.insert(step.layer, output.content().clone());
                    artifact.set_layer(output.clone());
                }
                Err(e) => error!("{} failed: {}", step.layer, e),
            }

            outcomes.push(StepOutcome {
                layer: step.layer,
                operator_id: step.operator_id.clone(),
                duration_ms,
                result,
            });
        }

        outcomes
    }

    /// Append one provenance entry per outcome
    pub(crate) fn record_outcomes(
        &self,
        tracker: &mut ProvenanceTracker,
        steps: &[OperatorStep],
        outcomes: &[StepOutcome],
    ) {
        let ai_available = self.backend_available();
        for outcome in outcomes {
            if let Some(step) = steps.iter().find(|s| s.layer == outcome.layer) {
                tracker.record(outcome.provenance(step, ai_available));
            }
        }
    }

    /// Cached operator for a layer, built on first use
    pub fn operator_for(&self, layer: Layer) -> Result<Arc<dyn Operator>> {
        let slot = &self.operators[layer.index()];
        if let Some(op) = slot.get() {
            return Ok(Arc::clone(op));
        }

        let binding = self.registry.get(layer)?;
        let op = slot.get_or_init(|| {
            debug!("Instantiating operator '{}' for {}", binding.operator_id, layer);
            binding.instantiate(self.backend.clone())
        });
        Ok(Arc::clone(op))
    }

    /// Re-run layers scoring below `threshold`; returns the layers replaced
    pub fn regenerate(
        &self,
        record: &mut Record,
        configs: &LayerConfigs,
        threshold: f64,
    ) -> Vec<Layer> {
        regenerate_weak_layers(record, configs, self, threshold)
    }
}

fn empty_cache() -> [OnceLock<Arc<dyn Operator>>; Layer::COUNT] {
    std::array::from_fn(|_| OnceLock::new())
}

/// First 8 characters of a v4 UUID
pub(crate) fn short_run_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AudienceProfile, Content, Expertise, LayerConfig, LayerContext};
    use crate::operators::StepConfig;
    use crate::orchestrator::toggles::LayerOverride;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingOperator;

    impl Operator for FailingOperator {
        fn id(&self) -> &str {
            "failing"
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
            Err(ScaffoldError::operator_failed(Layer::Structure, "failing", "boom"))
        }
    }

    /// Records which layers were visible in its context
    struct ContextRecorder {
        seen: Arc<std::sync::Mutex<Vec<Layer>>>,
    }

    impl Operator for ContextRecorder {
        fn id(&self) -> &str {
            "context_recorder"
        }

        fn layer(&self) -> Layer {
            Layer::Synthesis
        }

        fn execute(
            &self,
            _topic: &str,
            _audience: &AudienceProfile,
            context: &LayerContext,
            _config: &StepConfig,
        ) -> Result<LayerOutput> {
            *self.seen.lock().unwrap() = context.keys().copied().collect();
            Ok(LayerOutput::new(Layer::Synthesis, Content::new(), 0.9))
        }
    }

    fn conductor() -> Conductor {
        Conductor::new("does-not-exist")
    }

    #[test]
    fn test_compile_all_layers() {
        let record = conductor()
            .compile("entropy", "general", "default", None, None)
            .unwrap();

        assert_eq!(record.artifact.populated_layers(), Layer::ALL.to_vec());
        assert_eq!(record.current_revision(), 1);
        let revision = record.latest_revision().unwrap();
        assert_eq!(revision.reason, "Initial compilation");
        assert_eq!(revision.changed_layers, Layer::ALL.to_vec());
        assert_eq!(revision.score_after, Some(record.overall_score()));
        assert!(record.profile_checksum.is_none());

        assert_eq!(record.provenance.len(), 1);
        let tracker = &record.provenance[0];
        assert!(tracker.is_complete());
        assert_eq!(tracker.entries().len(), Layer::COUNT);
        assert!(tracker.failed_layers().is_empty());
        assert!(!tracker.entries()[0].ai_available);
    }

    #[test]
    fn test_failure_isolated() {
        let mut registry = OperatorRegistry::with_defaults();
        registry.bind(Layer::Structure, "failing", |_| {
            Arc::new(FailingOperator) as Arc<dyn Operator>
        });
        let conductor = conductor().with_registry(registry);

        let record = conductor
            .compile("entropy", "general", "default", None, None)
            .unwrap();

        assert!(!record.artifact.is_populated(Layer::Structure));
        assert_eq!(record.artifact.populated_layers().len(), Layer::COUNT - 1);
        let tracker = &record.provenance[0];
        assert_eq!(tracker.failed_layers(), vec![Layer::Structure]);
        let failed = &tracker.entries()[Layer::Structure.index()];
        assert_eq!(failed.operator_id, "failing");
        assert!(failed.error.as_deref().unwrap().contains("boom"));
    }

    #[test]
    fn test_run_plan_outcomes_in_order() {
        let mut registry = OperatorRegistry::with_defaults();
        registry.bind(Layer::Structure, "failing", |_| {
            Arc::new(FailingOperator) as Arc<dyn Operator>
        });
        let conductor = conductor().with_registry(registry);

        let mut configs = crate::core::default_layer_configs();
        configs.insert(Layer::Metaphor, LayerConfig::disabled());
        let plan = CallPlan::from_layer_configs(&configs, "p", conductor.registry()).unwrap();
        let audience = AudienceProfile::new("general", Expertise::Intermediate, ControlVector::MIDPOINT);
        let mut artifact = Artifact::new("entropy", audience);

        let outcomes = conductor.run_plan(&plan, &mut artifact);

        let layers: Vec<Layer> = outcomes.iter().map(|o| o.layer).collect();
        let expected: Vec<Layer> = Layer::ALL
            .iter()
            .copied()
            .filter(|l| *l != Layer::Metaphor)
            .collect();
        assert_eq!(layers, expected);
        let failed: Vec<Layer> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.layer)
            .collect();
        assert_eq!(failed, vec![Layer::Structure]);
    }

    #[test]
    fn test_context_accumulates_in_order() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder_seen = Arc::clone(&seen);
        let mut registry = OperatorRegistry::with_defaults();
        registry.bind(Layer::Synthesis, "context_recorder", move |_| {
            Arc::new(ContextRecorder {
                seen: Arc::clone(&recorder_seen),
            }) as Arc<dyn Operator>
        });
        let conductor = conductor().with_registry(registry);

        let mut overrides = LayerOverrides::new();
        overrides.insert(Layer::Transfer, LayerOverride::enabled(false));
        conductor
            .compile("entropy", "general", "default", Some(&overrides), None)
            .unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                Layer::Activation,
                Layer::Metaphor,
                Layer::Structure,
                Layer::Interrogation,
                Layer::Encoding,
                Layer::Reflection,
            ]
        );
    }

    #[test]
    fn test_operator_built_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let mut registry = OperatorRegistry::with_defaults();
        registry.bind(Layer::Structure, "failing", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(FailingOperator) as Arc<dyn Operator>
        });
        let conductor = conductor().with_registry(registry);

        for _ in 0..3 {
            conductor
                .compile("entropy", "general", "default", None, None)
                .unwrap();
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unbound_layer_propagates() {
        let mut registry = OperatorRegistry::with_defaults();
        registry.unbind(Layer::Encoding);
        let conductor = conductor().with_registry(registry);

        let err = conductor
            .compile("entropy", "general", "default", None, None)
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::UnboundLayer { layer: Layer::Encoding }));
    }

    #[test]
    fn test_explicit_vector_used() {
        let vector = ControlVector::uniform(0.9);
        let record = conductor()
            .compile("entropy", "phd", "default", None, Some(vector))
            .unwrap();
        assert_eq!(record.artifact.audience().control_vector, vector);
        assert_eq!(record.artifact.audience().expertise, Expertise::Expert);
    }

    #[test]
    fn test_short_run_id() {
        let id = short_run_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
