//! Retrieval chunks for vector-store ingestion

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{value_text, Adapter};
use crate::core::{Expertise, Layer, Record};

/// Content fields shorter than this (in characters) are not worth embedding
pub const MIN_CHUNK_CHARS: usize = 10;

/// Metadata stored alongside each chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub topic: String,
    pub audience_id: String,
    pub expertise_level: Expertise,
    pub profile: String,
    pub artifact_id: String,
    pub score: Option<f64>,
    pub layer: Layer,
    pub field: String,
    pub confidence: f64,
}

/// One embeddable piece of a layer's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagChunk {
    /// `<artifact_id>_<layer>_<field>`
    pub chunk_id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RagAdapter;

impl Adapter for RagAdapter {
    type Output = Vec<RagChunk>;

    /// One chunk per content field with enough text, layers in canonical order
    fn format(&self, record: &Record) -> Vec<RagChunk> {
        let artifact = &record.artifact;
        let audience = artifact.audience();
        let score = artifact.evaluation.as_ref().map(|e| e.overall_score);
        let mut chunks = Vec::new();

        for output in artifact.outputs() {
            for (field, value) in output.content() {
                let text = chunk_text(value);
                if text.chars().count() < MIN_CHUNK_CHARS {
                    continue;
                }

                chunks.push(RagChunk {
                    chunk_id: format!(
                        "{}_{}_{}",
                        artifact.artifact_id(),
                        output.layer(),
                        field
                    ),
                    content: text,
                    metadata: ChunkMetadata {
                        topic: artifact.topic().to_string(),
                        audience_id: audience.audience_id.clone(),
                        expertise_level: audience.expertise,
                        profile: record.profile_name.clone(),
                        artifact_id: artifact.artifact_id().to_string(),
                        score,
                        layer: output.layer(),
                        field: field.clone(),
                        confidence: output.confidence(),
                    },
                });
            }
        }

        chunks
    }
}

/// Flatten a content value into embeddable text
fn chunk_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, value_text(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Bool(false) => String::new(),
        _ => value_text(value),
    }
}
