// ABOUTME: Layer registry: the validated, acyclic set of layers for a run.
// ABOUTME: Fixes a deterministic topological order at construction.

use super::{EdgeLayer, IdentityLayer, ImageLayer, InfrastructureLayer, Layer, WorkloadLayer};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("layer '{0}' is registered more than once")]
    DuplicateLayer(String),

    #[error("layer '{layer}' depends on unknown layer '{predecessor}'")]
    UnknownPredecessor { layer: String, predecessor: String },

    #[error("layer dependencies form a cycle through: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// Layers in dependency order.
pub struct Registry {
    layers: Vec<Box<dyn Layer>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("layers", &self.names())
            .finish()
    }
}

impl Registry {
    /// Validate the graph and sort it.
    ///
    /// Kahn's algorithm; among layers that are ready at the same time the
    /// lower ordinal goes first, then registration order.
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Result<Self, RegistryError> {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, layer) in layers.iter().enumerate() {
            if index.insert(layer.name().to_string(), i).is_some() {
                return Err(RegistryError::DuplicateLayer(layer.name().to_string()));
            }
        }

        let mut in_degree = vec![0usize; layers.len()];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); layers.len()];
        for (i, layer) in layers.iter().enumerate() {
            for predecessor in layer.predecessors() {
                let &j = index.get(predecessor).ok_or_else(|| {
                    RegistryError::UnknownPredecessor {
                        layer: layer.name().to_string(),
                        predecessor: predecessor.to_string(),
                    }
                })?;
                in_degree[i] += 1;
                successors[j].push(i);
            }
        }

        let mut ready: BTreeSet<(u32, usize)> = (0..layers.len())
            .filter(|&i| in_degree[i] == 0)
            .map(|i| (layers[i].ordinal(), i))
            .collect();
        let mut order = Vec::with_capacity(layers.len());

        while let Some((_, i)) = ready.pop_first() {
            order.push(i);
            for &s in &successors[i] {
                in_degree[s] -= 1;
                if in_degree[s] == 0 {
                    ready.insert((layers[s].ordinal(), s));
                }
            }
        }

        if order.len() != layers.len() {
            let stuck = (0..layers.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| layers[i].name().to_string())
                .collect();
            return Err(RegistryError::Cycle(stuck));
        }

        let mut slots: Vec<Option<Box<dyn Layer>>> = layers.into_iter().map(Some).collect();
        let layers = order
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect();
        Ok(Self { layers })
    }

    /// The five bootstrap layers.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::new(vec![
            Box::new(InfrastructureLayer),
            Box::new(IdentityLayer),
            Box::new(ImageLayer),
            Box::new(EdgeLayer),
            Box::new(WorkloadLayer),
        ])
    }

    /// Apply order.
    pub fn order(&self) -> impl DoubleEndedIterator<Item = &dyn Layer> {
        self.layers.iter().map(|l| &**l)
    }

    /// Destroy order: exactly the reverse of [`Registry::order`].
    pub fn reverse_order(&self) -> impl Iterator<Item = &dyn Layer> {
        self.order().rev()
    }

    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Layer> {
        self.order().find(|l| l.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
