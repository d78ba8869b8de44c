//! Bare-label to dressed-index lookup and result staleness tracking.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dispatch::{DispatchClient, DispatchEvent, SenderId};
use crate::grid::NamedArray;
use crate::system::{Eigensystem, QuantumSystem};

/// Assigns dressed states to bare product states at one parameter point
pub trait StateMatcher: Send + Sync {
    /// Returns one entry per product-state label (flat, row-major over
    /// `bare_dims`) holding the matching dressed index, or `None`.
    fn match_states(&self, dressed: &Eigensystem, bare_dims: &[usize]) -> Vec<Option<usize>>;
}

/// Matches each product state to the dressed state with the largest squared
/// overlap, provided that overlap exceeds `threshold`.
///
/// Dressed eigenvectors are expected in the product basis of the bare
/// eigenstates, so the overlap with product state `k` is `|v[k]|^2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxOverlap {
    pub threshold: f64,
}

impl Default for MaxOverlap {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl StateMatcher for MaxOverlap {
    fn match_states(&self, dressed: &Eigensystem, bare_dims: &[usize]) -> Vec<Option<usize>> {
        let product_dim: usize = bare_dims.iter().product();
        (0..product_dim)
            .map(|k| {
                let mut best: Option<(usize, f64)> = None;
                for (j, vector) in dressed.eigenvectors.iter().enumerate() {
                    let weight = vector.get(k).map_or(0.0, |c| c.norm_sqr());
                    if best.is_none_or(|(_, w)| weight > w) {
                        best = Some((j, weight));
                    }
                }
                best.filter(|&(_, w)| w > self.threshold).map(|(j, _)| j)
            })
            .collect()
    }
}

/// Build the `dressed_indices` table from the dressed spectra of a sweep
pub fn generate_lookup<H: QuantumSystem>(
    hilbertspace: &H,
    dressed: &NamedArray<Eigensystem>,
    matcher: &dyn StateMatcher,
) -> NamedArray<Vec<Option<usize>>> {
    let bare_dims: Vec<usize> = (0..hilbertspace.subsystem_count())
        .map(|i| hilbertspace.truncated_dim(i))
        .collect();
    debug!(points = dressed.len(), ?bare_dims, "generating dressed lookup");
    dressed.map(|esys| matcher.match_states(esys, &bare_dims))
}

/// Per-sweep staleness flag kept current by the notification channel.
///
/// Events only mark results stale once a lookup table exists.
#[derive(Debug)]
pub struct SyncTracker {
    sweep_id: SenderId,
    system_id: SenderId,
    lookup_present: AtomicBool,
    out_of_sync: AtomicBool,
}

impl SyncTracker {
    pub fn new(sweep_id: SenderId, system_id: SenderId) -> Self {
        Self {
            sweep_id,
            system_id,
            lookup_present: AtomicBool::new(false),
            out_of_sync: AtomicBool::new(false),
        }
    }

    /// Tracker for results loaded from a record, which always carry a lookup table
    pub fn with_lookup(sweep_id: SenderId, system_id: SenderId) -> Self {
        let tracker = Self::new(sweep_id, system_id);
        tracker.lookup_present.store(true, Ordering::SeqCst);
        tracker
    }

    pub fn sweep_id(&self) -> SenderId {
        self.sweep_id
    }

    pub fn system_id(&self) -> SenderId {
        self.system_id
    }

    /// Record a freshly built lookup table
    pub fn mark_synced(&self) {
        self.lookup_present.store(true, Ordering::SeqCst);
        self.out_of_sync.store(false, Ordering::SeqCst);
    }

    pub fn lookup_present(&self) -> bool {
        self.lookup_present.load(Ordering::SeqCst)
    }

    pub fn is_out_of_sync(&self) -> bool {
        self.out_of_sync.load(Ordering::SeqCst)
    }
}

impl DispatchClient for SyncTracker {
    fn receive(&self, event: DispatchEvent, sender: SenderId) {
        let relevant = match event {
            DispatchEvent::SystemUpdate => sender == self.system_id,
            DispatchEvent::SweepUpdate => sender == self.sweep_id,
        };
        if relevant && self.lookup_present() {
            self.out_of_sync.store(true, Ordering::SeqCst);
        }
    }
}
