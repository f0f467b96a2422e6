//! Call plan: the ordered list of operator steps for one compile
//!
//! Steps always follow canonical layer order. Layers absent from the
//! configuration are left out of the plan entirely.

use serde::{Deserialize, Serialize};

use crate::core::{Layer, LayerConfig, LayerConfigs};
use crate::error::Result;
use crate::operators::{OperatorRegistry, StepConfig};

/// A single step in a call plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorStep {
    pub layer: Layer,
    /// Identity of the bound operator
    pub operator_id: String,
    pub config: StepConfig,
    pub enabled: bool,
    pub required: bool,
}

/// Ordered list of operator steps to execute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallPlan {
    steps: Vec<OperatorStep>,
    pub profile_name: String,
}

impl CallPlan {
    /// Build a plan from layer configs using the registry's bindings.
    ///
    /// Fails with `UnboundLayer` if a configured layer has no operator.
    pub fn from_layer_configs(
        configs: &LayerConfigs,
        profile_name: &str,
        registry: &OperatorRegistry,
    ) -> Result<Self> {
        let mut steps = Vec::with_capacity(configs.len());

        for layer in Layer::ALL {
            let Some(config) = configs.get(&layer) else {
                continue;
            };
            let binding = registry.get(layer)?;
            steps.push(step_for(layer, &binding.operator_id, config));
        }

        Ok(Self {
            steps,
            profile_name: profile_name.to_string(),
        })
    }

    pub fn steps(&self) -> &[OperatorStep] {
        &self.steps
    }

    /// Enabled steps, in plan order
    pub fn enabled_steps(&self) -> impl Iterator<Item = &OperatorStep> {
        self.steps.iter().filter(|s| s.enabled)
    }

    /// Steps that are both enabled and required, in plan order
    pub fn required_steps(&self) -> impl Iterator<Item = &OperatorStep> {
        self.steps.iter().filter(|s| s.enabled && s.required)
    }

    /// Step for a given layer, if planned
    pub fn step(&self, layer: Layer) -> Option<&OperatorStep> {
        self.steps.iter().find(|s| s.layer == layer)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn step_for(layer: Layer, operator_id: &str, config: &LayerConfig) -> OperatorStep {
    OperatorStep {
        layer,
        operator_id: operator_id.to_string(),
        config: StepConfig::new(),
        enabled: config.enabled,
        required: config.required,
    }
}
