//! Template operators
//!
//! One operator per layer. Each builds a prompt for the generation backend
//! and falls back to deterministic template content when the backend is
//! missing, unavailable, or errors. Fallback output depends only on the
//! inputs, so two compiles of the same topic and audience score the same.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::operator::{
    estimate_confidence, is_regeneration, parse_generated, GenerationBackend, Operator, StepConfig,
};
use crate::core::{AudienceProfile, Content, Expertise, Layer, LayerContext, LayerOutput};
use crate::error::Result;

/// Default operator for a single layer
pub struct TemplateOperator {
    layer: Layer,
    id: String,
    backend: Option<Arc<dyn GenerationBackend>>,
}

impl TemplateOperator {
    pub fn new(layer: Layer, backend: Option<Arc<dyn GenerationBackend>>) -> Self {
        Self {
            layer,
            id: template_id(layer),
            backend,
        }
    }

    fn backend_available(&self) -> bool {
        self.backend.as_ref().is_some_and(|b| b.is_available())
    }

    /// Prompt sent to the generation backend
    pub fn build_prompt(
        &self,
        topic: &str,
        audience: &AudienceProfile,
        context: &LayerContext,
        config: &StepConfig,
    ) -> String {
        let v = &audience.control_vector;
        let prior: Vec<&str> = context.keys().map(|l| l.as_str()).collect();
        let mut prompt = format!(
            "Produce the {} layer for the topic '{}'.\n\
             Audience: {} ({})\n\
             Control vector: language={:.2} abstraction={:.2} rigor={:.2} math={:.2} \
             domain={:.2} load={:.2} transfer={:.2}\n\
             Prior layers: {}\n\
             Instruction: {}\n\
             Respond with a single JSON object.",
            self.layer,
            topic,
            audience.name,
            audience.expertise,
            v.language_level,
            v.abstraction,
            v.rigor,
            v.math_density,
            v.domain_specificity,
            v.cognitive_load,
            v.transfer_distance,
            if prior.is_empty() {
                "none".to_string()
            } else {
                prior.join(", ")
            },
            layer_instruction(self.layer),
        );
        if is_regeneration(config) {
            prompt.push_str("\nThe previous attempt scored poorly; make this version richer.");
        }
        prompt
    }

    fn generate(&self, prompt: &str) -> Option<Content> {
        let backend = self.backend.as_ref()?;
        if !backend.is_available() {
            return None;
        }
        match backend.generate(prompt) {
            Ok(raw) => Some(parse_generated(&raw)),
            Err(e) => {
                warn!("{}: backend failed, using template fallback: {}", self.id, e);
                None
            }
        }
    }
}

impl Operator for TemplateOperator {
    fn id(&self) -> &str {
        &self.id
    }

    fn layer(&self) -> Layer {
        self.layer
    }

    fn execute(
        &self,
        topic: &str,
        audience: &AudienceProfile,
        context: &LayerContext,
        config: &StepConfig,
    ) -> Result<LayerOutput> {
        let prompt = self.build_prompt(topic, audience, context, config);
        let ai_available = self.backend_available();

        let content = match self.generate(&prompt) {
            Some(content) => content,
            None => {
                debug!("{}: template fallback for '{}'", self.id, topic);
                fallback_content(self.layer, topic, audience, context, is_regeneration(config))
            }
        };
        let confidence = estimate_confidence(&content);

        let mut provenance = Content::new();
        provenance.insert("operator".into(), json!(self.id));
        provenance.insert("ai_available".into(), json!(ai_available));
        provenance.insert("config".into(), Value::Object(config.clone()));

        Ok(LayerOutput::new(self.layer, content, confidence).with_provenance(provenance))
    }
}

/// Operator id used for a layer's template binding
pub fn template_id(layer: Layer) -> String {
    format!("template.{}", layer)
}

fn layer_instruction(layer: Layer) -> &'static str {
    match layer {
        Layer::Activation => "Open with a hook and surface relevant prior knowledge.",
        Layer::Metaphor => "Map the topic onto a familiar source domain.",
        Layer::Structure => "Outline the core components and how they relate.",
        Layer::Interrogation => "Ask questions that probe understanding of the structure.",
        Layer::Encoding => "Give memory aids that make the key ideas stick.",
        Layer::Transfer => "Show the idea applied in a different setting.",
        Layer::Reflection => "Prompt the learner to reflect on what changed in their thinking.",
        Layer::Synthesis => "Integrate every prior layer into one coherent summary.",
    }
}

fn source_domain(expertise: Expertise) -> &'static str {
    match expertise {
        Expertise::Beginner => "a busy kitchen",
        Expertise::Intermediate => "a city transit network",
        Expertise::Advanced => "a supply chain",
        Expertise::Expert => "a distributed system",
    }
}

fn fallback_content(
    layer: Layer,
    topic: &str,
    audience: &AudienceProfile,
    context: &LayerContext,
    regeneration: bool,
) -> Content {
    let who = &audience.name;
    let value = match layer {
        Layer::Activation => json!({
            "hook": format!("What do you already know about {}?", topic),
            "prior_knowledge": format!("Think of a time {} showed up in everyday life.", topic),
            "audience": audience.audience_id,
        }),
        Layer::Metaphor => json!({
            "metaphor": format!("{} works like {}.", topic, source_domain(audience.expertise)),
            "source_domain": source_domain(audience.expertise),
            "mapping": [
                format!("the parts of {} are the stations", topic),
                "the flow between them is the traffic",
            ],
        }),
        Layer::Structure => json!({
            "outline": [
                format!("What {} is", topic),
                format!("The components of {}", topic),
                format!("How {} behaves in practice", topic),
            ],
            "depth": audience.expertise.to_string(),
        }),
        Layer::Interrogation => {
            let anchor = if context.contains_key(&Layer::Structure) {
                "each outline step"
            } else {
                "the core idea"
            };
            json!({
                "questions": [
                    format!("Why does {} work the way it does?", topic),
                    format!("What would break if {} of {} were removed?", anchor, topic),
                    format!("How would you explain {} to someone new?", topic),
                ],
            })
        }
        Layer::Encoding => json!({
            "mnemonic": format!("Remember {} by its three parts: what, how, why.", topic),
            "key_terms": [topic],
            "audience": who,
        }),
        Layer::Transfer => json!({
            "application": format!("Apply {} to a problem outside its usual field.", topic),
            "far_transfer": audience.control_vector.transfer_distance >= 0.5,
        }),
        Layer::Reflection => json!({
            "prompts": [
                format!("What surprised you about {}?", topic),
                format!("Where is your understanding of {} still fuzzy?", topic),
            ],
        }),
        Layer::Synthesis => {
            let integrated: Vec<&str> = context.keys().map(|l| l.as_str()).collect();
            json!({
                "summary": format!(
                    "{} for {}, drawing on {} prior layers.",
                    topic,
                    who,
                    integrated.len()
                ),
                "layers_integrated": integrated,
            })
        }
    };

    let mut content = match value {
        Value::Object(map) => map,
        _ => Content::new(),
    };
    content.insert("topic".into(), json!(topic));
    if regeneration {
        content.insert(
            "elaboration".into(),
            json!(format!(
                "Revisited {} for {} with additional detail and worked examples.",
                topic, who
            )),
        );
    }
    content
}
