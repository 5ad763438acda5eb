//! Search space definitions and exhaustive grid enumeration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Parameter name as understood by the estimator (e.g. "C").
    pub name: String,
    /// Candidate values, enumerated in the given order.
    pub values: Vec<f64>,
}

/// The full search space: an ordered list of parameter definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterDef>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add_values(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            values,
        });
        self
    }

    /// Total number of grid points.
    pub fn grid_size(&self) -> usize {
        if self.parameters.is_empty() {
            return 0;
        }
        self.parameters
            .iter()
            .map(|p| p.values.len())
            .product()
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}

/// One point of the grid, remembering its position in enumeration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub index: usize,
    pub params: BTreeMap<String, f64>,
}

impl Candidate {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .params
            .iter()
            .map(|(name, value)| format!("{name}={value:e}"))
            .collect();
        write!(f, "#{} {{{}}}", self.index, parts.join(", "))
    }
}

/// Exhaustive grid search over the cartesian product of all dimensions.
///
/// Enumeration order is stable: the first parameter varies slowest, and each
/// dimension is walked in its declared order.
#[derive(Debug, Clone)]
pub struct GridSearch {
    space: SearchSpace,
    candidates: Vec<Candidate>,
}

impl GridSearch {
    pub fn new(space: SearchSpace) -> Self {
        let candidates = Self::build_grid(&space);
        Self { space, candidates }
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn build_grid(space: &SearchSpace) -> Vec<Candidate> {
        if space.parameters.is_empty() {
            return Vec::new();
        }

        // Cartesian product
        let mut combos: Vec<BTreeMap<String, f64>> = vec![BTreeMap::new()];
        for param in &space.parameters {
            let mut next = Vec::with_capacity(combos.len() * param.values.len());
            for existing in &combos {
                for value in &param.values {
                    let mut combo = existing.clone();
                    combo.insert(param.name.clone(), *value);
                    next.push(combo);
                }
            }
            combos = next;
        }

        combos
            .into_iter()
            .enumerate()
            .map(|(index, params)| Candidate { index, params })
            .collect()
    }
}
