//! Canonical layer identifiers
//!
//! Layers run in a fixed order; later layers may read the content of
//! earlier ones. The derived `Ord` is that order, so every `BTreeMap`
//! keyed by `Layer` iterates canonically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScaffoldError};

/// One stage of the content pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Prior-knowledge activation and hook
    Activation,
    /// Anchoring analogy
    Metaphor,
    /// Conceptual outline
    Structure,
    /// Probing questions
    Interrogation,
    /// Memory aids
    Encoding,
    /// Application to new contexts
    Transfer,
    /// Metacognitive prompts
    Reflection,
    /// Integration of all prior layers
    Synthesis,
}

impl Layer {
    /// Number of canonical layers
    pub const COUNT: usize = 8;

    /// All layers in canonical execution order
    pub const ALL: [Layer; Layer::COUNT] = [
        Layer::Activation,
        Layer::Metaphor,
        Layer::Structure,
        Layer::Interrogation,
        Layer::Encoding,
        Layer::Transfer,
        Layer::Reflection,
        Layer::Synthesis,
    ];

    /// Stable string id used in profiles, logs and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Activation => "activation",
            Layer::Metaphor => "metaphor",
            Layer::Structure => "structure",
            Layer::Interrogation => "interrogation",
            Layer::Encoding => "encoding",
            Layer::Transfer => "transfer",
            Layer::Reflection => "reflection",
            Layer::Synthesis => "synthesis",
        }
    }

    /// Position in canonical order (0-based)
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = ScaffoldError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        Layer::ALL
            .iter()
            .copied()
            .find(|layer| layer.as_str() == needle)
            .ok_or_else(|| ScaffoldError::UnknownLayer {
                name: s.to_string(),
            })
    }
}
