//! Live parameter sweep bound to a mutable system handle.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::dispatch::{DispatchEvent, NotificationChannel, SenderId};
use crate::error::{Result, SweepError};
use crate::executor::Executor;
use crate::grid::NamedArray;
use crate::parameters::Parameters;
use crate::sweep::bare::bare_spectrum_sweep;
use crate::sweep::config::SweepConfig;
use crate::sweep::data::{
    BARE_ESYS, DRESSED_ESYS, DRESSED_INDICES, SweepData, SweepRecord, SweepResult,
};
use crate::sweep::dressed::dressed_spectrum_sweep;
use crate::sweep::lookup::{MaxOverlap, StateMatcher, SyncTracker, generate_lookup};
use crate::sweep::view::SweepBase;
use crate::system::{QuantumSystem, SubsysUpdateInfo, UpdateFn};

/// State handed to custom sweep generators
pub struct SweepContext<'a, H> {
    parameters: &'a Parameters,
    data: &'a SweepData,
    hilbertspace: &'a mut H,
    update: &'a UpdateFn<H>,
    evals_count: usize,
}

impl<H> SweepContext<'_, H> {
    pub fn parameters(&self) -> &Parameters {
        self.parameters
    }

    /// Results computed so far in this run
    pub fn data(&self) -> &SweepData {
        self.data
    }

    pub fn hilbertspace(&self) -> &H {
        &*self.hilbertspace
    }

    pub fn evals_count(&self) -> usize {
        self.evals_count
    }

    /// Apply the update function for the grid point `indices`, returning its values
    pub fn move_to(&mut self, indices: &[usize]) -> Result<Vec<f64>> {
        let point = self.parameters.get_point(indices)?;
        (self.update)(self.hilbertspace, &point)?;
        Ok(point)
    }
}

/// Produces one named result from the state of a sweep
pub type SweepGenerator<H> = Arc<dyn Fn(&mut SweepContext<'_, H>) -> Result<SweepResult> + Send + Sync>;

/// Wrap a closure as a [`SweepGenerator`]
pub fn custom_sweep<H, F>(f: F) -> SweepGenerator<H>
where
    H: 'static,
    F: Fn(&mut SweepContext<'_, H>) -> Result<SweepResult> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Generator evaluating `f` at every grid point, in row-major order.
///
/// The system is moved to each point before `f` runs. The result is a
/// [`SweepResult::Scalar`] over the parameter dimensions.
pub fn per_point<H, F>(f: F) -> SweepGenerator<H>
where
    H: 'static,
    F: Fn(&SweepContext<'_, H>, &[usize]) -> Result<f64> + Send + Sync + 'static,
{
    custom_sweep(move |ctx: &mut SweepContext<'_, H>| {
        let indices: Vec<Vec<usize>> = ctx.parameters().grid_indices().collect();
        let mut values = Vec::with_capacity(indices.len());
        for index in &indices {
            ctx.move_to(index)?;
            values.push(f(ctx, index)?);
        }
        let array = NamedArray::try_from_data(ctx.parameters().dimensions(), values)?;
        Ok(SweepResult::Scalar(array))
    })
}

/// Parameter sweep over a live system handle.
///
/// The sweep owns the handle for its whole lifetime and is the only party
/// that moves it between parameter points. Results are built by
/// [`ParameterSweep::run`] in the order bare spectra, dressed spectra,
/// lookup table, custom sweeps.
///
/// # Example
/// ```ignore
/// let channel = Arc::new(NotificationChannel::new());
/// let system = TransmonResonator::new(Arc::clone(&channel));
/// let parameters = Parameters::new([("flux", flux_vals), ("g", g_vals)]);
/// let update: UpdateFn<_> = Arc::new(|sys: &mut TransmonResonator, point: &[f64]| {
///     sys.set_flux(point[0]);
///     sys.set_coupling(point[1]);
///     Ok(())
/// });
/// let config = SweepConfig::new().evals_count(10).subsys_update("flux", vec![0]);
/// let sweep = ParameterSweep::new(system, parameters, update, config, channel)?;
/// let dressed = sweep.data().dressed_esys()?;
/// ```
pub struct ParameterSweep<H> {
    parameters: Parameters,
    hilbertspace: H,
    update: UpdateFn<H>,
    generators: Vec<(String, SweepGenerator<H>)>,
    evals_count: usize,
    num_cpus: usize,
    subsys_update_info: Option<SubsysUpdateInfo>,
    matcher: Arc<dyn StateMatcher>,
    data: SweepData,
    channel: Arc<NotificationChannel>,
    tracker: Arc<SyncTracker>,
}

impl<H> ParameterSweep<H>
where
    H: QuantumSystem + Clone + Send + Sync,
{
    /// Bind a system handle and parameters. Runs the sweep right away when
    /// `config.autorun` is set.
    pub fn new(
        hilbertspace: H,
        parameters: Parameters,
        update: UpdateFn<H>,
        config: SweepConfig,
        channel: Arc<NotificationChannel>,
    ) -> Result<Self> {
        if config.num_cpus == 0 {
            return Err(SweepError::Config(
                "num_cpus must be at least 1".to_string(),
            ));
        }
        if let Some(info) = &config.subsys_update_info {
            validate_update_info(info, &parameters, hilbertspace.subsystem_count())?;
        }

        let sweep_id = channel.register_sender();
        let tracker = Arc::new(SyncTracker::new(sweep_id, hilbertspace.dispatch_id()));
        let client = Arc::downgrade(&tracker);
        channel.subscribe(client);

        let mut sweep = Self {
            parameters,
            hilbertspace,
            update,
            generators: Vec::new(),
            evals_count: config.evals_count,
            num_cpus: config.num_cpus,
            subsys_update_info: config.subsys_update_info,
            matcher: Arc::new(MaxOverlap::default()),
            data: SweepData::new(),
            channel,
            tracker,
        };
        if config.autorun {
            sweep.run()?;
        }
        Ok(sweep)
    }

    /// Replace the state matcher used for the lookup table of the next run
    pub fn with_matcher(mut self, matcher: Arc<dyn StateMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Register a custom sweep evaluated at the end of every run
    pub fn with_generator(mut self, name: impl Into<String>, generator: SweepGenerator<H>) -> Self {
        self.generators.push((name.into(), generator));
        self
    }

    /// Compute all results.
    ///
    /// The first grid point is applied once with the channel enabled. The
    /// channel is then suppressed until the run returns, on success or on
    /// error. A failing point aborts the run and leaves the previous results
    /// untouched.
    pub fn run(&mut self) -> Result<()> {
        info!(
            axes = ?self.parameters.names(),
            points = self.parameters.total_points(),
            subsystems = self.hilbertspace.subsystem_count(),
            num_cpus = self.num_cpus,
            "starting parameter sweep"
        );
        self.cause_dispatch()?;

        let channel = Arc::clone(&self.channel);
        let _guard = channel.suppress();

        let data = self.compute()?;
        self.data = data;
        self.tracker.mark_synced();
        info!(results = self.data.len(), "parameter sweep finished");
        Ok(())
    }

    /// Move the handle to the first grid point with the channel enabled so
    /// any one-time reactions to an update happen outside the bulk run
    pub fn cause_dispatch(&mut self) -> Result<()> {
        if self.parameters.total_points() == 0 {
            return Ok(());
        }
        let first = vec![0; self.parameters.len()];
        let point = self.parameters.get_point(&first)?;
        (self.update)(&mut self.hilbertspace, &point)
    }

    fn compute(&mut self) -> Result<SweepData> {
        let mut data = SweepData::new();
        let executor = Executor::new(self.num_cpus)?;

        info!("bare spectrum phase");
        let bare = bare_spectrum_sweep(
            &mut self.hilbertspace,
            &self.parameters,
            &self.update,
            self.subsys_update_info.as_ref(),
            &executor,
        )?;

        info!("dressed spectrum phase");
        let dressed = dressed_spectrum_sweep(
            &mut self.hilbertspace,
            &self.parameters,
            &self.update,
            &bare,
            self.evals_count,
            &executor,
        )?;

        info!("lookup phase");
        let lookup = generate_lookup(&self.hilbertspace, &dressed, self.matcher.as_ref());

        data.insert(BARE_ESYS, SweepResult::Spectrum(bare));
        data.insert(DRESSED_ESYS, SweepResult::Spectrum(dressed));
        data.insert(DRESSED_INDICES, SweepResult::Indices(lookup));

        for (name, sweep_fn) in &self.generators {
            debug!(sweep = %name, "custom sweep");
            let result = sweep_fn(&mut SweepContext {
                parameters: &self.parameters,
                data: &data,
                hilbertspace: &mut self.hilbertspace,
                update: &self.update,
                evals_count: self.evals_count,
            })?;
            data.insert(name.clone(), result);
        }
        Ok(data)
    }

    /// Register a custom sweep. If results already exist it is evaluated
    /// immediately and its result stored under `name`.
    pub fn add_sweep(&mut self, name: impl Into<String>, generator: SweepGenerator<H>) -> Result<()> {
        let name = name.into();
        if self.tracker.lookup_present() {
            let channel = Arc::clone(&self.channel);
            let _guard = channel.suppress();
            debug!(sweep = %name, "custom sweep");
            let result = generator(&mut SweepContext {
                parameters: &self.parameters,
                data: &self.data,
                hilbertspace: &mut self.hilbertspace,
                update: &self.update,
                evals_count: self.evals_count,
            })?;
            self.data.insert(name.clone(), result);
        }
        self.generators.push((name, generator));
        Ok(())
    }

    /// Replace the parameter axes; results are stale until the next run
    pub fn set_parameters(&mut self, parameters: Parameters) -> Result<()> {
        if let Some(info) = &self.subsys_update_info {
            validate_update_info(info, &parameters, self.hilbertspace.subsystem_count())?;
        }
        self.parameters = parameters;
        self.publish_update();
        Ok(())
    }

    pub fn set_evals_count(&mut self, evals_count: usize) {
        self.evals_count = evals_count;
        self.publish_update();
    }

    /// Overwrite one stored result, returning the previous one
    pub fn replace_result(&mut self, name: impl Into<String>, result: SweepResult) -> Option<SweepResult> {
        let previous = self.data.insert(name, result);
        self.publish_update();
        previous
    }

    /// Mutable access to the handle. Changes made through it are expected to
    /// announce themselves on the channel.
    pub fn hilbertspace_mut(&mut self) -> &mut H {
        &mut self.hilbertspace
    }

    pub fn num_cpus(&self) -> usize {
        self.num_cpus
    }

    pub fn sweep_id(&self) -> SenderId {
        self.tracker.sweep_id()
    }

    pub fn channel(&self) -> &Arc<NotificationChannel> {
        &self.channel
    }

    /// Snapshot of the parameters and results
    pub fn to_record(&self) -> SweepRecord {
        SweepRecord {
            paramvals_by_name: self.parameters.clone(),
            evals_count: self.evals_count,
            data: self.data.clone(),
        }
    }

    fn publish_update(&self) {
        self.channel
            .publish(DispatchEvent::SweepUpdate, self.tracker.sweep_id());
    }
}

impl<H: QuantumSystem> SweepBase for ParameterSweep<H> {
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

impl<H> fmt::Debug for ParameterSweep<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSweep")
            .field("parameters", &self.parameters)
            .field("evals_count", &self.evals_count)
            .field("num_cpus", &self.num_cpus)
            .field("results", &self.data.names().collect::<Vec<_>>())
            .field("generators", &self.generators.len())
            .finish_non_exhaustive()
    }
}

fn validate_update_info(
    info: &SubsysUpdateInfo,
    parameters: &Parameters,
    subsystem_count: usize,
) -> Result<()> {
    for (axis, subsystems) in info {
        parameters.index_by_name(axis)?;
        if let Some(&bad) = subsystems.iter().find(|&&s| s >= subsystem_count) {
            return Err(SweepError::Config(format!(
                "axis '{axis}' lists subsystem {bad}, but the system has {subsystem_count}"
            )));
        }
    }
    Ok(())
}
