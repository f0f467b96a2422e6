//! Output Adapters
//!
//! Read-only formatters that turn a compiled `Record` into the shape a
//! downstream integration consumes:
//!
//! - `ChatbotAdapter`: chat messages in progressive-disclosure order
//! - `RagAdapter`: retrieval chunks with per-field metadata
//! - `EtlAdapter`: one flat row for warehouse ingestion

mod chatbot;
mod etl;
mod rag;

pub use chatbot::{ChatMessage, ChatRole, ChatbotAdapter, DISCLOSURE_ORDER};
pub use etl::{EtlAdapter, EtlRecord};
pub use rag::{ChunkMetadata, RagAdapter, RagChunk, MIN_CHUNK_CHARS};

use serde::Serialize;
use serde_json::Value;

use crate::core::Record;

/// Formats a record for one integration. Never mutates the record.
pub trait Adapter {
    type Output: Serialize;

    fn format(&self, record: &Record) -> Self::Output;
}

/// Plain text for a scalar JSON value
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}
