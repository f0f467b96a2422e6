//! Operator registry
//!
//! Static binding table from layer to operator. Bindings carry a factory
//! rather than an instance so the conductor can build each operator once,
//! lazily, with the shared generation backend.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::operator::{GenerationBackend, Operator};
use super::template::{template_id, TemplateOperator};
use crate::core::Layer;
use crate::error::{Result, ScaffoldError};

/// Builds an operator, given the optional shared backend
pub type OperatorFactory =
    Arc<dyn Fn(Option<Arc<dyn GenerationBackend>>) -> Arc<dyn Operator> + Send + Sync>;

/// One entry in the binding table
#[derive(Clone)]
pub struct OperatorBinding {
    pub operator_id: String,
    factory: OperatorFactory,
}

impl OperatorBinding {
    /// Instantiate the bound operator
    pub fn instantiate(&self, backend: Option<Arc<dyn GenerationBackend>>) -> Arc<dyn Operator> {
        (self.factory)(backend)
    }
}

impl fmt::Debug for OperatorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorBinding")
            .field("operator_id", &self.operator_id)
            .finish_non_exhaustive()
    }
}

/// Registry of layer → operator bindings
#[derive(Clone, Debug, Default)]
pub struct OperatorRegistry {
    bindings: BTreeMap<Layer, OperatorBinding>,
}

impl OperatorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every layer bound to its template operator
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for layer in Layer::ALL {
            registry.bind(layer, template_id(layer), move |backend| {
                Arc::new(TemplateOperator::new(layer, backend)) as Arc<dyn Operator>
            });
        }
        registry
    }

    /// Bind (or rebind) a layer to an operator factory
    pub fn bind<F>(&mut self, layer: Layer, operator_id: impl Into<String>, factory: F)
    where
        F: Fn(Option<Arc<dyn GenerationBackend>>) -> Arc<dyn Operator> + Send + Sync + 'static,
    {
        self.bindings.insert(
            layer,
            OperatorBinding {
                operator_id: operator_id.into(),
                factory: Arc::new(factory),
            },
        );
    }

    /// Remove a layer's binding, returning it if present
    pub fn unbind(&mut self, layer: Layer) -> Option<OperatorBinding> {
        self.bindings.remove(&layer)
    }

    /// Get the binding for a layer
    pub fn get(&self, layer: Layer) -> Result<&OperatorBinding> {
        self.bindings
            .get(&layer)
            .ok_or(ScaffoldError::UnboundLayer { layer })
    }

    /// Check if a layer is bound
    pub fn is_bound(&self, layer: Layer) -> bool {
        self.bindings.contains_key(&layer)
    }

    /// Bound layers in canonical order
    pub fn bound_layers(&self) -> Vec<Layer> {
        self.bindings.keys().copied().collect()
    }
}
