//! Audience profiles and the control-vector catalog
//!
//! An audience is resolved from its id through an injected, read-only
//! `AudienceCatalog`. Unknown ids fall back to the midpoint vector and the
//! "intermediate" expertise label.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Seven-dimensional audience control vector, each dimension in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlVector {
    /// Vocabulary complexity (0 = simple, 1 = expert)
    pub language_level: f64,
    /// Concrete vs abstract
    pub abstraction: f64,
    /// Informal vs formal
    pub rigor: f64,
    /// Math notation density
    pub math_density: f64,
    /// General vs domain-expert framing
    pub domain_specificity: f64,
    /// Cognitive demand level
    pub cognitive_load: f64,
    /// Near vs far transfer
    pub transfer_distance: f64,
}

impl ControlVector {
    /// Vector with every dimension at the midpoint (0.5)
    pub const MIDPOINT: ControlVector = ControlVector::uniform(0.5);

    /// Vector with the same value on every dimension
    pub const fn uniform(value: f64) -> Self {
        Self {
            language_level: value,
            abstraction: value,
            rigor: value,
            math_density: value,
            domain_specificity: value,
            cognitive_load: value,
            transfer_distance: value,
        }
    }

    /// Build a vector, clamping every dimension into [0, 1]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        language_level: f64,
        abstraction: f64,
        rigor: f64,
        math_density: f64,
        domain_specificity: f64,
        cognitive_load: f64,
        transfer_distance: f64,
    ) -> Self {
        Self {
            language_level,
            abstraction,
            rigor,
            math_density,
            domain_specificity,
            cognitive_load,
            transfer_distance,
        }
        .clamped()
    }

    /// Copy with every dimension clamped into [0, 1] (NaN becomes 0.5)
    pub fn clamped(self) -> Self {
        let c = |v: f64| if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) };
        Self {
            language_level: c(self.language_level),
            abstraction: c(self.abstraction),
            rigor: c(self.rigor),
            math_density: c(self.math_density),
            domain_specificity: c(self.domain_specificity),
            cognitive_load: c(self.cognitive_load),
            transfer_distance: c(self.transfer_distance),
        }
    }

    /// Dimensions in declaration order
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.language_level,
            self.abstraction,
            self.rigor,
            self.math_density,
            self.domain_specificity,
            self.cognitive_load,
            self.transfer_distance,
        ]
    }
}

impl Default for ControlVector {
    fn default() -> Self {
        Self::MIDPOINT
    }
}

/// Expertise label attached to an audience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expertise {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl fmt::Display for Expertise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Expertise::Beginner => "beginner",
            Expertise::Intermediate => "intermediate",
            Expertise::Advanced => "advanced",
            Expertise::Expert => "expert",
        };
        f.write_str(label)
    }
}

/// Resolved audience passed to every operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceProfile {
    pub audience_id: String,
    /// Display name derived from the id ("data_scientist" -> "Data Scientist")
    pub name: String,
    pub expertise: Expertise,
    pub control_vector: ControlVector,
}

impl AudienceProfile {
    pub fn new(audience_id: &str, expertise: Expertise, control_vector: ControlVector) -> Self {
        Self {
            audience_id: audience_id.to_string(),
            name: display_name(audience_id),
            expertise,
            control_vector: control_vector.clamped(),
        }
    }
}

/// Read-only lookup from audience id to control vector and expertise
#[derive(Debug, Clone, Default)]
pub struct AudienceCatalog {
    vectors: HashMap<String, ControlVector>,
    expertise: HashMap<String, Expertise>,
}

impl AudienceCatalog {
    /// Create an empty catalog (every id resolves to the midpoint defaults)
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in audience table
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();

        catalog.insert_vector(
            "child",
            ControlVector::new(0.1, 0.1, 0.1, 0.0, 0.0, 0.2, 0.2),
        );
        catalog.insert_vector("general", ControlVector::MIDPOINT);
        catalog.insert_vector(
            "data_scientist",
            ControlVector::new(0.8, 0.7, 0.8, 0.7, 0.8, 0.8, 0.6),
        );
        catalog.insert_vector(
            "phd",
            ControlVector::new(0.9, 0.9, 0.95, 0.9, 0.9, 0.9, 0.8),
        );

        for (id, level) in [
            ("child", Expertise::Beginner),
            ("general", Expertise::Intermediate),
            ("data_analyst", Expertise::Advanced),
            ("data_scientist", Expertise::Expert),
            ("ml_engineer", Expertise::Expert),
            ("genai_engineer", Expertise::Expert),
            ("phd", Expertise::Expert),
            ("academics", Expertise::Expert),
            ("business_analyst", Expertise::Intermediate),
        ] {
            catalog.insert_expertise(id, level);
        }

        catalog
    }

    /// Register (or replace) the control vector for an audience id
    pub fn insert_vector(&mut self, audience_id: &str, vector: ControlVector) {
        self.vectors.insert(audience_id.to_string(), vector.clamped());
    }

    /// Register (or replace) the expertise label for an audience id
    pub fn insert_expertise(&mut self, audience_id: &str, expertise: Expertise) {
        self.expertise.insert(audience_id.to_string(), expertise);
    }

    /// Control vector for an id, if the catalog knows it
    pub fn vector(&self, audience_id: &str) -> Option<ControlVector> {
        self.vectors.get(audience_id).copied()
    }

    /// Expertise label for an id, defaulting to intermediate
    pub fn expertise(&self, audience_id: &str) -> Expertise {
        self.expertise
            .get(audience_id)
            .copied()
            .unwrap_or_default()
    }

    /// Resolve an audience: explicit vector, then catalog, then midpoint
    pub fn resolve(&self, audience_id: &str, explicit: Option<ControlVector>) -> AudienceProfile {
        let vector = explicit
            .or_else(|| self.vector(audience_id))
            .unwrap_or(ControlVector::MIDPOINT);
        AudienceProfile::new(audience_id, self.expertise(audience_id), vector)
    }
}

pub(crate) fn display_name(audience_id: &str) -> String {
    audience_id
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_audience() {
        let catalog = AudienceCatalog::with_defaults();
        let audience = catalog.resolve("data_scientist", None);

        assert_eq!(audience.name, "Data Scientist");
        assert_eq!(audience.expertise, Expertise::Expert);
        assert_eq!(audience.control_vector.language_level, 0.8);
    }

    #[test]
    fn test_resolve_unknown_defaults_to_midpoint() {
        let catalog = AudienceCatalog::with_defaults();
        let audience = catalog.resolve("sailor", None);

        assert_eq!(audience.expertise, Expertise::Intermediate);
        assert_eq!(audience.control_vector, ControlVector::MIDPOINT);
        assert!(audience.control_vector.as_array().iter().all(|v| *v == 0.5));
    }

    #[test]
    fn test_expertise_without_vector() {
        // data_analyst has a label but no vector in the built-in table
        let catalog = AudienceCatalog::with_defaults();
        let audience = catalog.resolve("data_analyst", None);

        assert_eq!(audience.expertise, Expertise::Advanced);
        assert_eq!(audience.control_vector, ControlVector::MIDPOINT);
    }

    #[test]
    fn test_explicit_vector_wins_and_is_clamped() {
        let catalog = AudienceCatalog::with_defaults();
        let explicit = ControlVector {
            rigor: 1.7,
            math_density: -0.3,
            ..ControlVector::uniform(0.2)
        };
        let audience = catalog.resolve("child", Some(explicit));

        assert_eq!(audience.control_vector.rigor, 1.0);
        assert_eq!(audience.control_vector.math_density, 0.0);
        assert_eq!(audience.control_vector.language_level, 0.2);
        assert_eq!(audience.expertise, Expertise::Beginner);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("genai_engineer"), "Genai Engineer");
        assert_eq!(display_name("phd"), "Phd");
    }
}
