//! Boundary between the sweep engine and the quantum system it drives.
//!
//! The engine never diagonalizes anything itself. It asks a [`QuantumSystem`]
//! for per-subsystem (bare) and composite (dressed) eigensystems after the
//! user's update function has moved the system to a parameter point.

use std::sync::Arc;

use num_complex::Complex64;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::dispatch::SenderId;
use crate::error::Result;

/// State vector in some basis of the system, complex amplitudes
pub type StateVector = Vec<Complex64>;

/// Eigenvalues with their eigenvectors; `eigenvectors[j]` belongs to `eigenvalues[j]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Eigensystem {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: Vec<StateVector>,
}

impl Eigensystem {
    pub fn new(eigenvalues: Vec<f64>, eigenvectors: Vec<StateVector>) -> Self {
        Self {
            eigenvalues,
            eigenvectors,
        }
    }

    /// Eigensystem whose eigenvectors have real amplitudes
    pub fn from_real(eigenvalues: Vec<f64>, eigenvectors: Vec<Vec<f64>>) -> Self {
        let eigenvectors = eigenvectors
            .into_iter()
            .map(|vector| vector.into_iter().map(Complex64::from).collect())
            .collect();
        Self::new(eigenvalues, eigenvectors)
    }

    /// Number of eigenpairs
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }

    pub fn eigenvector(&self, index: usize) -> Option<&[Complex64]> {
        self.eigenvectors.get(index).map(Vec::as_slice)
    }
}

/// A composite quantum system ("Hilbert space") built from an ordered list of subsystems.
///
/// Implementations publish [`crate::dispatch::DispatchEvent::SystemUpdate`] under
/// [`QuantumSystem::dispatch_id`] whenever their configuration changes.
pub trait QuantumSystem {
    fn subsystem_count(&self) -> usize;

    /// Subsystem names in subsystem order
    fn subsystem_names(&self) -> Vec<String>;

    fn subsystem_index(&self, name: &str) -> Option<usize> {
        self.subsystem_names().iter().position(|n| n == name)
    }

    /// Number of bare levels kept for a subsystem
    fn truncated_dim(&self, subsystem: usize) -> usize;

    /// Bare eigensystem of one subsystem with `evals_count` levels
    fn subsystem_eigensys(&self, subsystem: usize, evals_count: usize) -> Result<Eigensystem>;

    /// Dressed eigensystem of the composite system.
    ///
    /// `bare_esys[i]` is the already computed bare eigensystem of subsystem `i`
    /// at the current parameter point; eigenvectors are returned in the product
    /// basis of these bare states (row-major over the subsystems).
    fn eigensys(&self, evals_count: usize, bare_esys: &[&Eigensystem]) -> Result<Eigensystem>;

    /// Sender identity used when this system announces updates
    fn dispatch_id(&self) -> SenderId;

    /// Dimension of the truncated product space
    fn dimension(&self) -> usize {
        (0..self.subsystem_count())
            .map(|i| self.truncated_dim(i))
            .product()
    }
}

/// Moves a system to a parameter point; receives one value per axis, in axis order
pub type UpdateFn<H> = Arc<dyn Fn(&mut H, &[f64]) -> Result<()> + Send + Sync>;

/// Axis name to the subsystems whose bare spectrum depends on that axis
pub type SubsysUpdateInfo = FxHashMap<String, Vec<usize>>;

/// Flat index of a product-state label, row-major over the subsystem dimensions
pub fn product_index(label: &[usize], dims: &[usize]) -> Option<usize> {
    if label.len() != dims.len() {
        return None;
    }
    let mut flat = 0;
    for (&level, &dim) in label.iter().zip(dims) {
        if level >= dim {
            return None;
        }
        flat = flat * dim + level;
    }
    Some(flat)
}

/// Product-state label of a flat index; inverse of [`product_index`]
pub fn product_label(mut flat: usize, dims: &[usize]) -> Option<Vec<usize>> {
    if flat >= dims.iter().product() {
        return None;
    }
    let mut label = vec![0; dims.len()];
    for (slot, &dim) in label.iter_mut().zip(dims).rev() {
        *slot = flat % dim;
        flat /= dim;
    }
    Some(label)
}
