//! Artifact, record and revision types
//!
//! An `Artifact` accumulates one optional output per layer for a single
//! topic/audience pair. A `Record` wraps it with revision history and the
//! provenance of every run that touched it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::audience::AudienceProfile;
use super::layer::Layer;
use super::scoring::EvaluationResult;
use crate::orchestrator::provenance::ProvenanceTracker;

/// Structured content produced by an operator
pub type Content = serde_json::Map<String, serde_json::Value>;

/// Content of already-populated layers, iterated in canonical order
pub type LayerContext = BTreeMap<Layer, Content>;

/// Output of a single operator run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLayerOutput")]
pub struct LayerOutput {
    layer: Layer,
    content: Content,
    confidence: f64,
    provenance: Content,
    timestamp: DateTime<Utc>,
}

/// Wire form of `LayerOutput`; confidence is clamped on the way in
#[derive(Deserialize)]
struct RawLayerOutput {
    layer: Layer,
    content: Content,
    confidence: f64,
    #[serde(default)]
    provenance: Content,
    timestamp: DateTime<Utc>,
}

impl From<RawLayerOutput> for LayerOutput {
    fn from(raw: RawLayerOutput) -> Self {
        Self {
            layer: raw.layer,
            content: raw.content,
            confidence: clamp_confidence(raw.confidence),
            provenance: raw.provenance,
            timestamp: raw.timestamp,
        }
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

impl LayerOutput {
    /// Create an output; confidence is clamped into [0, 1]
    pub fn new(layer: Layer, content: Content, confidence: f64) -> Self {
        Self {
            layer,
            content,
            confidence: clamp_confidence(confidence),
            provenance: Content::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_provenance(mut self, provenance: Content) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn provenance(&self) -> &Content {
        &self.provenance
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Multi-layer output for one topic + audience compilation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    artifact_id: String,
    topic: String,
    audience: AudienceProfile,
    layers: BTreeMap<Layer, LayerOutput>,
    /// Latest score; replaced wholesale on every (re)score
    pub evaluation: Option<EvaluationResult>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Artifact {
    /// Create an empty artifact. Topic and audience are fixed from here on.
    pub fn new(topic: &str, audience: AudienceProfile) -> Self {
        let now = Utc::now();
        Self {
            artifact_id: Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            audience,
            layers: BTreeMap::new(),
            evaluation: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn audience(&self) -> &AudienceProfile {
        &self.audience
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Output stored in a layer slot, if populated
    pub fn layer(&self, layer: Layer) -> Option<&LayerOutput> {
        self.layers.get(&layer)
    }

    /// Fill (or replace) a layer slot and bump `updated_at`
    pub fn set_layer(&mut self, output: LayerOutput) {
        self.layers.insert(output.layer(), output);
        self.updated_at = Utc::now();
    }

    /// Whether a layer slot is populated
    pub fn is_populated(&self, layer: Layer) -> bool {
        self.layers.contains_key(&layer)
    }

    /// Populated layer ids in canonical order
    pub fn populated_layers(&self) -> Vec<Layer> {
        self.layers.keys().copied().collect()
    }

    /// Populated outputs in canonical order
    pub fn outputs(&self) -> impl Iterator<Item = &LayerOutput> {
        self.layers.values()
    }

    /// Accumulated context built from every populated layer
    pub fn context(&self) -> LayerContext {
        self.layers
            .iter()
            .map(|(layer, output)| (*layer, output.content().clone()))
            .collect()
    }
}

/// A single entry in a record's revision history. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// Monotonic from 1
    pub revision_id: u32,
    pub timestamp: DateTime<Utc>,
    pub changed_layers: Vec<Layer>,
    pub reason: String,
    pub score_before: Option<f64>,
    pub score_after: Option<f64>,
}

/// Artifact plus revision history, created once per compile call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub record_id: String,
    pub artifact: Artifact,
    pub profile_name: String,
    /// SHA-256 of the profile file the configs came from (None for defaults)
    pub profile_checksum: Option<String>,
    revision_history: Vec<Revision>,
    current_revision: u32,
    /// One tracker per run: the initial compile and each regeneration
    pub provenance: Vec<ProvenanceTracker>,
}

impl Record {
    pub fn new(artifact: Artifact, profile_name: &str) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            artifact,
            profile_name: profile_name.to_string(),
            profile_checksum: None,
            revision_history: Vec::new(),
            current_revision: 0,
            provenance: Vec::new(),
        }
    }

    /// Append a revision and advance `current_revision`
    pub fn add_revision(
        &mut self,
        changed_layers: Vec<Layer>,
        reason: impl Into<String>,
        score_before: Option<f64>,
        score_after: Option<f64>,
    ) -> &Revision {
        self.current_revision += 1;
        self.revision_history.push(Revision {
            revision_id: self.current_revision,
            timestamp: Utc::now(),
            changed_layers,
            reason: reason.into(),
            score_before,
            score_after,
        });
        &self.revision_history[self.revision_history.len() - 1]
    }

    pub fn revision_history(&self) -> &[Revision] {
        &self.revision_history
    }

    pub fn current_revision(&self) -> u32 {
        self.current_revision
    }

    pub fn latest_revision(&self) -> Option<&Revision> {
        self.revision_history.last()
    }

    /// Overall score of the current evaluation (0 when unscored)
    pub fn overall_score(&self) -> f64 {
        self.artifact
            .evaluation
            .as_ref()
            .map(|e| e.overall_score)
            .unwrap_or(0.0)
    }
}
