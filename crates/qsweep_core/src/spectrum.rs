use serde::{Deserialize, Serialize};

use crate::grid::NamedArray;
use crate::system::{Eigensystem, StateVector};

/// Energies and states along a single swept parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumData {
    pub param_name: String,
    pub param_vals: Vec<f64>,
    /// `energy_table[i]` holds the eigenvalues at `param_vals[i]`
    pub energy_table: Vec<Vec<f64>>,
    /// `state_table[i]` holds the eigenvectors at `param_vals[i]`
    pub state_table: Vec<Vec<StateVector>>,
    /// Subsystem the data belongs to; `None` for the composite system
    pub subsystem: Option<String>,
}

impl SpectrumData {
    /// Collect a one-dimensional eigensystem array. Returns `None` unless the
    /// array has exactly one dimension.
    pub fn from_array(array: &NamedArray<Eigensystem>, subsystem: Option<String>) -> Option<Self> {
        let [dim] = array.dims() else {
            return None;
        };
        Some(Self {
            param_name: dim.name.clone(),
            param_vals: dim.labels.clone(),
            energy_table: array.data().iter().map(|e| e.eigenvalues.clone()).collect(),
            state_table: array.data().iter().map(|e| e.eigenvectors.clone()).collect(),
            subsystem,
        })
    }

    pub fn len(&self) -> usize {
        self.param_vals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.param_vals.is_empty()
    }

    /// Energy of level `level` across the parameter values; `None` where the
    /// level was not computed
    pub fn level(&self, level: usize) -> Vec<Option<f64>> {
        self.energy_table
            .iter()
            .map(|evals| evals.get(level).copied())
            .collect()
    }
}
