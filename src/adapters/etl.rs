//! Flat rows for data pipelines
//!
//! Every field is a scalar or a short list so the row can be loaded into
//! a warehouse table without further unpacking.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use super::Adapter;
use crate::core::{Expertise, Layer, Record};

/// One warehouse row per record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtlRecord {
    pub artifact_id: String,
    pub record_id: String,
    pub topic: String,
    pub audience_id: String,
    pub audience_name: String,
    pub expertise_level: Expertise,
    pub profile_name: String,
    pub revision: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub cv_language_level: f64,
    pub cv_abstraction: f64,
    pub cv_rigor: f64,
    pub cv_math_density: f64,
    pub cv_domain_specificity: f64,
    pub cv_cognitive_load: f64,
    pub cv_transfer_distance: f64,

    pub score: Option<f64>,
    pub penalty_applied: bool,
    pub penalty_reason: Option<String>,
    pub missing_required: Vec<Layer>,

    /// `layer_<name>_populated` and `layer_<name>_confidence` for every layer
    #[serde(flatten)]
    pub layer_fields: BTreeMap<String, Value>,

    pub layers_populated: Vec<Layer>,
    pub num_layers: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EtlAdapter;

impl Adapter for EtlAdapter {
    type Output = EtlRecord;

    fn format(&self, record: &Record) -> EtlRecord {
        let artifact = &record.artifact;
        let audience = artifact.audience();
        let cv = &audience.control_vector;
        let evaluation = artifact.evaluation.as_ref();

        let mut layer_fields = BTreeMap::new();
        for layer in Layer::ALL {
            let output = artifact.layer(layer);
            layer_fields.insert(format!("layer_{}_populated", layer), json!(output.is_some()));
            layer_fields.insert(
                format!("layer_{}_confidence", layer),
                json!(output.map(|o| o.confidence())),
            );
        }

        let layers_populated = artifact.populated_layers();

        EtlRecord {
            artifact_id: artifact.artifact_id().to_string(),
            record_id: record.record_id.clone(),
            topic: artifact.topic().to_string(),
            audience_id: audience.audience_id.clone(),
            audience_name: audience.name.clone(),
            expertise_level: audience.expertise,
            profile_name: record.profile_name.clone(),
            revision: record.current_revision(),
            created_at: artifact.created_at(),
            updated_at: artifact.updated_at(),

            cv_language_level: cv.language_level,
            cv_abstraction: cv.abstraction,
            cv_rigor: cv.rigor,
            cv_math_density: cv.math_density,
            cv_domain_specificity: cv.domain_specificity,
            cv_cognitive_load: cv.cognitive_load,
            cv_transfer_distance: cv.transfer_distance,

            score: evaluation.map(|e| e.overall_score),
            penalty_applied: evaluation.is_some_and(|e| e.penalty_applied),
            penalty_reason: evaluation.and_then(|e| e.penalty_reason.clone()),
            missing_required: evaluation
                .map(|e| e.missing_required.clone())
                .unwrap_or_default(),

            layer_fields,
            num_layers: layers_populated.len(),
            layers_populated,
        }
    }
}
