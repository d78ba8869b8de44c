//! Shared fixtures: a two-subsystem mock system with solve counters

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::dispatch::{DispatchClient, DispatchEvent, NotificationChannel, SenderId};
use crate::error::{Result, SweepError};
use crate::parameters::Parameters;
use crate::system::{Eigensystem, QuantumSystem, UpdateFn, product_label};

pub const QUBIT_DIM: usize = 3;
pub const RESONATOR_DIM: usize = 2;

/// Qubit with levels `n * (1 + flux)` next to a resonator with levels `n * freq`.
///
/// The composite spectrum is the sorted list of product energies; eigenvectors
/// are unit vectors in the product basis, so every product state has an exact
/// dressed partner.
#[derive(Clone)]
pub struct MockSystem {
    pub flux: f64,
    pub freq: f64,
    /// Qubit solves fail at this flux value
    pub fail_flux: Option<f64>,
    channel: Arc<NotificationChannel>,
    id: SenderId,
    pub bare_solves: Arc<AtomicUsize>,
    pub dressed_solves: Arc<AtomicUsize>,
    pub updates: Arc<AtomicUsize>,
}

impl MockSystem {
    pub fn new(channel: Arc<NotificationChannel>) -> Self {
        let id = channel.register_sender();
        Self {
            flux: 0.0,
            freq: 1.0,
            fail_flux: None,
            channel,
            id,
            bare_solves: Arc::new(AtomicUsize::new(0)),
            dressed_solves: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_flux(&mut self, flux: f64) {
        self.flux = flux;
        self.changed();
    }

    pub fn set_freq(&mut self, freq: f64) {
        self.freq = freq;
        self.changed();
    }

    fn changed(&self) {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.channel.publish(DispatchEvent::SystemUpdate, self.id);
    }

    pub fn bare_solve_count(&self) -> usize {
        self.bare_solves.load(Ordering::SeqCst)
    }

    pub fn dressed_solve_count(&self) -> usize {
        self.dressed_solves.load(Ordering::SeqCst)
    }

    fn level_spacing(&self, subsystem: usize) -> f64 {
        if subsystem == 0 {
            1.0 + self.flux
        } else {
            self.freq
        }
    }
}

impl QuantumSystem for MockSystem {
    fn subsystem_count(&self) -> usize {
        2
    }

    fn subsystem_names(&self) -> Vec<String> {
        vec!["qubit".to_string(), "resonator".to_string()]
    }

    fn truncated_dim(&self, subsystem: usize) -> usize {
        if subsystem == 0 {
            QUBIT_DIM
        } else {
            RESONATOR_DIM
        }
    }

    fn subsystem_eigensys(&self, subsystem: usize, evals_count: usize) -> Result<Eigensystem> {
        self.bare_solves.fetch_add(1, Ordering::SeqCst);
        if subsystem == 0 && self.fail_flux == Some(self.flux) {
            return Err(SweepError::Eigensolve {
                subsystem: Some(0),
                reason: format!("no convergence at flux {}", self.flux),
            });
        }
        let dim = self.truncated_dim(subsystem);
        let spacing = self.level_spacing(subsystem);
        let evals = (0..evals_count).map(|n| n as f64 * spacing).collect();
        let evecs = (0..evals_count).map(|n| unit(dim, n)).collect();
        Ok(Eigensystem::from_real(evals, evecs))
    }

    fn eigensys(&self, evals_count: usize, bare_esys: &[&Eigensystem]) -> Result<Eigensystem> {
        self.dressed_solves.fetch_add(1, Ordering::SeqCst);
        if bare_esys.len() != 2 {
            return Err(SweepError::Eigensolve {
                subsystem: None,
                reason: format!("expected 2 bare spectra, got {}", bare_esys.len()),
            });
        }
        let dims = [QUBIT_DIM, RESONATOR_DIM];
        let total = self.dimension();
        let mut levels: Vec<(usize, f64)> = (0..total)
            .map(|flat| {
                let label = product_label(flat, &dims).unwrap_or_default();
                let energy = label
                    .iter()
                    .zip(bare_esys)
                    .map(|(&level, esys)| esys.eigenvalues[level])
                    .sum();
                (flat, energy)
            })
            .collect();
        levels.sort_by(|a, b| a.1.total_cmp(&b.1));
        levels.truncate(evals_count);

        let evals = levels.iter().map(|&(_, e)| e).collect();
        let evecs = levels.iter().map(|&(flat, _)| unit(total, flat)).collect();
        Ok(Eigensystem::from_real(evals, evecs))
    }

    fn dispatch_id(&self) -> SenderId {
        self.id
    }
}

fn unit(dim: usize, index: usize) -> Vec<f64> {
    let mut v = vec![0.0; dim];
    v[index] = 1.0;
    v
}

/// `flux = [0.0, 0.5, 1.0]`, `freq = [2.0, 3.0]`
pub fn flux_freq_parameters() -> Parameters {
    Parameters::new([("flux", vec![0.0, 0.5, 1.0]), ("freq", vec![2.0, 3.0])])
}

pub fn flux_freq_update() -> UpdateFn<MockSystem> {
    Arc::new(|system: &mut MockSystem, point: &[f64]| {
        system.set_flux(point[0]);
        system.set_freq(point[1]);
        Ok(())
    })
}

/// Counts every event delivered by a channel
#[derive(Default)]
pub struct EventCounter {
    seen: AtomicUsize,
}

impl EventCounter {
    pub fn subscribe(channel: &NotificationChannel) -> Arc<Self> {
        let counter = Arc::new(Self::default());
        let client: Weak<dyn DispatchClient> = Arc::downgrade(&counter) as Weak<dyn DispatchClient>;
        channel.subscribe(client);
        counter
    }

    pub fn count(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

impl DispatchClient for EventCounter {
    fn receive(&self, _event: DispatchEvent, _sender: SenderId) {
        self.seen.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}
