//! Chat messages for conversational front ends
//!
//! One assistant message per populated layer, in the order a tutor would
//! reveal them, followed by a system message carrying the score.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{value_text, Adapter};
use crate::core::{display_name, Content, Layer, Record};

/// Order layers are disclosed in. Synthesis is left for the learner.
pub const DISCLOSURE_ORDER: [Layer; 7] = [
    Layer::Activation,
    Layer::Metaphor,
    Layer::Structure,
    Layer::Interrogation,
    Layer::Encoding,
    Layer::Transfer,
    Layer::Reflection,
];

/// Content keys that describe the request rather than the explanation
const METADATA_KEYS: [&str; 2] = ["topic", "audience"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Layer name, or "evaluation" for the score summary
    pub layer: String,
    pub confidence: f64,
    pub metadata: Content,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChatbotAdapter;

impl Adapter for ChatbotAdapter {
    type Output = Vec<ChatMessage>;

    fn format(&self, record: &Record) -> Vec<ChatMessage> {
        let artifact = &record.artifact;
        let mut messages = Vec::new();

        for layer in DISCLOSURE_ORDER {
            let Some(output) = artifact.layer(layer) else {
                continue;
            };

            let mut metadata = Content::new();
            metadata.insert("topic".into(), json!(artifact.topic()));
            metadata.insert("audience".into(), json!(artifact.audience().audience_id));

            messages.push(ChatMessage {
                role: ChatRole::Assistant,
                content: render_content(output.content()),
                layer: layer.as_str().to_string(),
                confidence: output.confidence(),
                metadata,
            });
        }

        if let Some(evaluation) = &artifact.evaluation {
            let mut metadata = Content::new();
            metadata.insert("layer_scores".into(), json!(evaluation.layer_scores));
            metadata.insert("penalty".into(), json!(evaluation.penalty_applied));

            messages.push(ChatMessage {
                role: ChatRole::System,
                content: format!(
                    "Understanding score: {:.0}%",
                    evaluation.overall_score * 100.0
                ),
                layer: "evaluation".to_string(),
                confidence: 1.0,
                metadata,
            });
        }

        messages
    }
}

/// Readable text for one layer's content
fn render_content(content: &Content) -> String {
    let mut parts = Vec::new();

    for (key, value) in content {
        if METADATA_KEYS.contains(&key.as_str()) {
            continue;
        }
        let label = display_name(key);
        match value {
            Value::Array(items) if !items.is_empty() => {
                parts.push(format!("**{}:**", label));
                for item in items {
                    parts.push(format!("  - {}", value_text(item)));
                }
            }
            Value::Object(map) if !map.is_empty() => {
                parts.push(format!("**{}:**", label));
                for (k, v) in map {
                    parts.push(format!("  - **{}**: {}", k, value_text(v)));
                }
            }
            Value::Array(_) | Value::Object(_) | Value::Null => {}
            _ => parts.push(format!("**{}:** {}", label, value_text(value))),
        }
    }

    if parts.is_empty() {
        Value::Object(content.clone()).to_string()
    } else {
        parts.join("\n")
    }
}
