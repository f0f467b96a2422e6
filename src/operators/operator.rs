//! Operator and generation-backend traits
//!
//! Operators receive the accumulated context of earlier layers but never
//! talk to each other directly.

use crate::core::{AudienceProfile, Content, Layer, LayerContext, LayerOutput};
use crate::error::Result;

/// Per-step operator configuration
pub type StepConfig = Content;

/// Step-config key set when a layer is re-run by regeneration
pub const REGENERATION_FLAG: &str = "regeneration";

/// Capability implemented by every layer operator
pub trait Operator: Send + Sync {
    /// Stable operator identity (recorded in provenance)
    fn id(&self) -> &str;

    /// Layer this operator produces
    fn layer(&self) -> Layer;

    /// Produce the layer's output.
    ///
    /// Implementations fall back to local content when their backend is
    /// unavailable; an `Err` is reserved for truly exceptional conditions and
    /// is absorbed per-step by the conductor.
    fn execute(
        &self,
        topic: &str,
        audience: &AudienceProfile,
        context: &LayerContext,
        config: &StepConfig,
    ) -> Result<LayerOutput>;
}

/// External content-generation service shared by operators
pub trait GenerationBackend: Send + Sync {
    /// Whether the backend can currently serve requests
    fn is_available(&self) -> bool;

    /// Generate raw text for a prompt
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Parse raw generated text into structured content.
///
/// Strips a surrounding Markdown code fence, then accepts a JSON object;
/// anything else is wrapped as `{"text": raw}`.
pub fn parse_generated(raw: &str) -> Content {
    let text = strip_code_fence(raw.trim());
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(text) {
        return map;
    }
    let mut content = Content::new();
    content.insert("text".into(), serde_json::Value::String(raw.to_string()));
    content
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body_start) = rest.find('\n') else {
        return text;
    };
    let body = &rest[body_start + 1..];
    match body.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => text,
    }
}

/// Confidence heuristic based on content richness
pub fn estimate_confidence(content: &Content) -> f64 {
    if content.is_empty() {
        return 0.0;
    }
    let size = serde_json::to_string(content).map(|s| s.len()).unwrap_or(0);
    match size {
        0..=49 => 0.3,
        50..=199 => 0.5,
        200..=499 => 0.7,
        _ => 0.8,
    }
}

/// Whether a step config carries the regeneration flag
pub fn is_regeneration(config: &StepConfig) -> bool {
    config
        .get(REGENERATION_FLAG)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}
