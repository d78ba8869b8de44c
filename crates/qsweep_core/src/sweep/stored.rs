//! Read-only sweep rebuilt from a [`SweepRecord`].

use std::fmt;
use std::sync::Arc;

use crate::dispatch::NotificationChannel;
use crate::error::Result;
use crate::parameters::Parameters;
use crate::sweep::config::SweepConfig;
use crate::sweep::data::{DRESSED_INDICES, SweepData, SweepRecord};
use crate::sweep::lookup::SyncTracker;
use crate::sweep::parameter_sweep::ParameterSweep;
use crate::sweep::view::SweepBase;
use crate::system::{QuantumSystem, UpdateFn};

/// Results of an earlier sweep together with a bound system handle.
///
/// Nothing is recomputed; the handle is only used to answer structural
/// queries (subsystem names and dimensions) and to spawn new live sweeps.
pub struct StoredSweep<H> {
    parameters: Parameters,
    evals_count: usize,
    data: SweepData,
    hilbertspace: H,
    channel: Arc<NotificationChannel>,
    tracker: Arc<SyncTracker>,
}

impl<H: QuantumSystem> StoredSweep<H> {
    pub fn from_record(record: SweepRecord, hilbertspace: H, channel: Arc<NotificationChannel>) -> Self {
        let sweep_id = channel.register_sender();
        let system_id = hilbertspace.dispatch_id();
        let tracker = if record.data.contains(DRESSED_INDICES) {
            SyncTracker::with_lookup(sweep_id, system_id)
        } else {
            SyncTracker::new(sweep_id, system_id)
        };
        let tracker = Arc::new(tracker);
        let client = Arc::downgrade(&tracker);
        channel.subscribe(client);

        Self {
            parameters: record.paramvals_by_name,
            evals_count: record.evals_count,
            data: record.data,
            hilbertspace,
            channel,
            tracker,
        }
    }

    pub fn to_record(&self) -> SweepRecord {
        SweepRecord {
            paramvals_by_name: self.parameters.clone(),
            evals_count: self.evals_count,
            data: self.data.clone(),
        }
    }

    pub fn get_hilbertspace(&self) -> &H {
        &self.hilbertspace
    }

    /// Start a live sweep on a clone of the bound handle, sharing this
    /// sweep's notification channel
    pub fn new_sweep(
        &self,
        parameters: Parameters,
        update: UpdateFn<H>,
        config: SweepConfig,
    ) -> Result<ParameterSweep<H>>
    where
        H: Clone + Send + Sync,
    {
        ParameterSweep::new(
            self.hilbertspace.clone(),
            parameters,
            update,
            config,
            Arc::clone(&self.channel),
        )
    }
}

impl<H: QuantumSystem> SweepBase for StoredSweep<H> {
    type System = H;

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn data(&self) -> &SweepData {
        &self.data
    }

    fn hilbertspace(&self) -> &H {
        &self.hilbertspace
    }

    fn evals_count(&self) -> usize {
        self.evals_count
    }

    fn is_out_of_sync(&self) -> bool {
        self.tracker.is_out_of_sync()
    }
}

impl<H> fmt::Debug for StoredSweep<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSweep")
            .field("parameters", &self.parameters)
            .field("evals_count", &self.evals_count)
            .field("results", &self.data.names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
