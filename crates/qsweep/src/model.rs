//! Built-in composite system: anharmonic oscillators with exchange coupling.
//!
//! Each oscillator is a diagonal ladder with `E_n = ω n − K n(n−1)/2` on its
//! truncated Fock space. Couplings add `g (a†b + a b†)` between two
//! oscillators. The composite Hamiltonian is assembled in the product basis
//! of the bare eigenstates handed in by the sweep, so the dressed
//! eigenvectors line up with product-state labels.

use std::sync::Arc;

use nalgebra::{DMatrix, SymmetricEigen};
use qsweep_core::system::product_label;
use qsweep_core::{
    Complex64, DispatchEvent, Eigensystem, NotificationChannel, QuantumSystem, Result, SenderId,
    StateVector, SweepError,
};

/// Relative convergence threshold of the Hermitian eigensolver
const EIGEN_EPSILON: f64 = 1e-14;
/// Iteration cap of the Hermitian eigensolver
const EIGEN_MAX_ITERATIONS: usize = 10_000;

/// One anharmonic mode
#[derive(Debug, Clone, PartialEq)]
pub struct Oscillator {
    pub name: String,
    pub frequency: f64,
    pub anharmonicity: f64,
    pub truncated_dim: usize,
}

impl Oscillator {
    pub fn new(name: impl Into<String>, frequency: f64, truncated_dim: usize) -> Self {
        Self {
            name: name.into(),
            frequency,
            anharmonicity: 0.0,
            truncated_dim,
        }
    }

    pub fn with_anharmonicity(mut self, anharmonicity: f64) -> Self {
        self.anharmonicity = anharmonicity;
        self
    }

    /// Energy of Fock level `n`
    pub fn level_energy(&self, n: usize) -> f64 {
        let n = n as f64;
        self.frequency * n - self.anharmonicity * n * (n - 1.0) / 2.0
    }
}

/// Exchange coupling between two oscillators, by position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coupling {
    pub first: usize,
    pub second: usize,
    pub strength: f64,
}

/// Handle to a chain of coupled oscillators.
///
/// Clones share the notification channel and the sender identity, so a
/// change made through any clone reaches every sweep bound to the handle.
#[derive(Debug, Clone)]
pub struct OscillatorChain {
    oscillators: Vec<Oscillator>,
    couplings: Vec<Coupling>,
    channel: Arc<NotificationChannel>,
    id: SenderId,
}

impl OscillatorChain {
    pub fn new(channel: Arc<NotificationChannel>) -> Self {
        let id = channel.register_sender();
        Self {
            oscillators: Vec::new(),
            couplings: Vec::new(),
            channel,
            id,
        }
    }

    pub fn with_oscillator(mut self, oscillator: Oscillator) -> Self {
        self.oscillators.push(oscillator);
        self
    }

    /// Couple two distinct oscillators already in the chain
    pub fn with_coupling(mut self, first: usize, second: usize, strength: f64) -> Result<Self> {
        let count = self.oscillators.len();
        if first == second || first >= count || second >= count {
            return Err(SweepError::Config(format!(
                "cannot couple oscillators {first} and {second} in a chain of {count}"
            )));
        }
        self.couplings.push(Coupling {
            first,
            second,
            strength,
        });
        Ok(self)
    }

    pub fn oscillators(&self) -> &[Oscillator] {
        &self.oscillators
    }

    pub fn couplings(&self) -> &[Coupling] {
        &self.couplings
    }

    pub fn set_frequency(&mut self, oscillator: usize, frequency: f64) -> Result<()> {
        self.oscillator_mut(oscillator)?.frequency = frequency;
        self.notify();
        Ok(())
    }

    pub fn set_anharmonicity(&mut self, oscillator: usize, anharmonicity: f64) -> Result<()> {
        self.oscillator_mut(oscillator)?.anharmonicity = anharmonicity;
        self.notify();
        Ok(())
    }

    pub fn set_coupling_strength(&mut self, coupling: usize, strength: f64) -> Result<()> {
        let count = self.couplings.len();
        let entry = self
            .couplings
            .get_mut(coupling)
            .ok_or_else(|| SweepError::Update(format!("no coupling {coupling} among {count}")))?;
        entry.strength = strength;
        self.notify();
        Ok(())
    }

    fn oscillator_mut(&mut self, index: usize) -> Result<&mut Oscillator> {
        let count = self.oscillators.len();
        self.oscillators
            .get_mut(index)
            .ok_or_else(|| SweepError::Update(format!("no oscillator {index} among {count}")))
    }

    fn notify(&self) {
        self.channel.publish(DispatchEvent::SystemUpdate, self.id);
    }
}

/// Matrix of the lowering operator between bare eigenstates: entry
/// `(k', k)` is `<k'| a |k>`.
fn lowering_matrix(esys: &Eigensystem, dim: usize) -> DMatrix<Complex64> {
    DMatrix::from_fn(dim, dim, |row, col| {
        let (bra, ket) = (&esys.eigenvectors[row], &esys.eigenvectors[col]);
        (1..dim)
            .map(|n| bra[n - 1].conj() * ket[n] * (n as f64).sqrt())
            .sum::<Complex64>()
    })
}

/// Eigenpairs of a Hermitian matrix in ascending eigenvalue order.
///
/// Each eigenvector is rescaled by a global phase so that its
/// largest-magnitude amplitude is real and positive. Returns `None` if the
/// solver does not converge.
fn hermitian_eigen(matrix: DMatrix<Complex64>) -> Option<(Vec<f64>, Vec<StateVector>)> {
    let eigen = SymmetricEigen::try_new(matrix, EIGEN_EPSILON, EIGEN_MAX_ITERATIONS)?;
    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[i].total_cmp(&eigen.eigenvalues[j]));

    let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let vectors = order
        .iter()
        .map(|&i| {
            let mut vector: StateVector = eigen.eigenvectors.column(i).iter().copied().collect();
            fix_phase(&mut vector);
            vector
        })
        .collect();
    Some((values, vectors))
}

fn fix_phase(vector: &mut [Complex64]) {
    let pivot = vector
        .iter()
        .copied()
        .fold(Complex64::new(0.0, 0.0), |best, c| {
            if c.norm_sqr() > best.norm_sqr() { c } else { best }
        });
    let norm = pivot.norm();
    if norm > 0.0 {
        let phase = pivot.conj() / norm;
        for amplitude in vector.iter_mut() {
            *amplitude *= phase;
        }
    }
}

impl QuantumSystem for OscillatorChain {
    fn subsystem_count(&self) -> usize {
        self.oscillators.len()
    }

    fn subsystem_names(&self) -> Vec<String> {
        self.oscillators.iter().map(|o| o.name.clone()).collect()
    }

    fn truncated_dim(&self, subsystem: usize) -> usize {
        self.oscillators
            .get(subsystem)
            .map_or(0, |o| o.truncated_dim)
    }

    fn subsystem_eigensys(&self, subsystem: usize, evals_count: usize) -> Result<Eigensystem> {
        let oscillator = self
            .oscillators
            .get(subsystem)
            .ok_or_else(|| SweepError::Eigensolve {
                subsystem: Some(subsystem),
                reason: "no such oscillator".to_string(),
            })?;
        let dim = oscillator.truncated_dim;
        let mut levels: Vec<(usize, f64)> =
            (0..dim).map(|n| (n, oscillator.level_energy(n))).collect();
        levels.sort_by(|a, b| a.1.total_cmp(&b.1));
        levels.truncate(evals_count);

        let eigenvalues = levels.iter().map(|&(_, energy)| energy).collect();
        let eigenvectors = levels
            .iter()
            .map(|&(n, _)| (0..dim).map(|k| if k == n { 1.0 } else { 0.0 }).collect())
            .collect();
        Ok(Eigensystem::from_real(eigenvalues, eigenvectors))
    }

    fn eigensys(&self, evals_count: usize, bare_esys: &[&Eigensystem]) -> Result<Eigensystem> {
        if bare_esys.len() != self.oscillators.len() {
            return Err(SweepError::Eigensolve {
                subsystem: None,
                reason: format!(
                    "expected {} bare eigensystems, got {}",
                    self.oscillators.len(),
                    bare_esys.len()
                ),
            });
        }
        let dims: Vec<usize> = self.oscillators.iter().map(|o| o.truncated_dim).collect();
        for (subsystem, (esys, &dim)) in bare_esys.iter().zip(&dims).enumerate() {
            if esys.len() != dim || esys.eigenvectors.iter().any(|v| v.len() != dim) {
                return Err(SweepError::Eigensolve {
                    subsystem: Some(subsystem),
                    reason: format!("bare eigensystem spans {} of {dim} states", esys.len()),
                });
            }
        }

        let total = self.dimension();
        let labels = (0..total)
            .map(|flat| {
                product_label(flat, &dims).ok_or_else(|| SweepError::Eigensolve {
                    subsystem: None,
                    reason: format!("product index {flat} outside the composite space"),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let lowering: Vec<DMatrix<Complex64>> = bare_esys
            .iter()
            .zip(&dims)
            .map(|(esys, &dim)| lowering_matrix(esys, dim))
            .collect();

        let mut hamiltonian = DMatrix::<Complex64>::zeros(total, total);
        for (row, label) in labels.iter().enumerate() {
            let energy: f64 = label
                .iter()
                .zip(bare_esys)
                .map(|(&level, esys)| esys.eigenvalues[level])
                .sum();
            hamiltonian[(row, row)] = Complex64::from(energy);
        }
        for coupling in &self.couplings {
            let (a, b) = (coupling.first, coupling.second);
            let (low_a, low_b) = (&lowering[a], &lowering[b]);
            for (row, bra) in labels.iter().enumerate() {
                for (col, ket) in labels.iter().enumerate() {
                    let spectators_match = bra
                        .iter()
                        .zip(ket)
                        .enumerate()
                        .all(|(s, (x, y))| s == a || s == b || x == y);
                    if !spectators_match {
                        continue;
                    }
                    // <bra| a†_a a_b + a_a a†_b |ket>
                    let raise_a_lower_b =
                        low_a[(ket[a], bra[a])].conj() * low_b[(bra[b], ket[b])];
                    let lower_a_raise_b =
                        low_a[(bra[a], ket[a])] * low_b[(ket[b], bra[b])].conj();
                    hamiltonian[(row, col)] += (raise_a_lower_b + lower_a_raise_b) * coupling.strength;
                }
            }
        }

        let (mut eigenvalues, mut eigenvectors) =
            hermitian_eigen(hamiltonian).ok_or_else(|| SweepError::Eigensolve {
                subsystem: None,
                reason: format!("Hermitian eigensolver did not converge for dimension {total}"),
            })?;
        eigenvalues.truncate(evals_count);
        eigenvectors.truncate(evals_count);
        Ok(Eigensystem::new(eigenvalues, eigenvectors))
    }

    fn dispatch_id(&self) -> SenderId {
        self.id
    }
}
