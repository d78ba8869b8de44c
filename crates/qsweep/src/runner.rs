//! Runs a sweep file end to end and writes the JSON result.

use std::path::Path;
use std::sync::Arc;

use color_eyre::eyre::WrapErr;
use jiff::Timestamp;
use qsweep_core::{
    NotificationChannel, ParameterSweep, QuantumSystem, StoredSweep, SweepBase, SweepContext,
    SweepRecord, SweepResult, custom_sweep,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SweepFile;
use crate::io::atomic_write;
use crate::model::OscillatorChain;

/// Name of the result holding the lowest dressed transition energy per point
pub const LOWEST_TRANSITION: &str = "lowest_transition";

/// Envelope written to the output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutput {
    pub generated_at: Timestamp,
    /// Oscillator names in subsystem order
    pub subsystems: Vec<String>,
    pub record: SweepRecord,
}

impl SweepOutput {
    pub fn from_json(json: &str) -> color_eyre::Result<Self> {
        serde_json::from_str(json).wrap_err("failed to parse sweep output")
    }

    pub fn to_json(&self) -> color_eyre::Result<String> {
        serde_json::to_string_pretty(self).wrap_err("failed to serialize sweep output")
    }

    /// Rebind the stored results to a system built from `file`
    pub fn into_stored(
        self,
        file: &SweepFile,
        channel: Arc<NotificationChannel>,
    ) -> color_eyre::Result<StoredSweep<OscillatorChain>> {
        let system = file.build_system(Arc::clone(&channel))?;
        Ok(StoredSweep::from_record(self.record, system, channel))
    }
}

/// Build and run the sweep described by `file`
pub fn run_sweep(
    file: &SweepFile,
    num_cpus: Option<usize>,
    channel: Arc<NotificationChannel>,
) -> color_eyre::Result<ParameterSweep<OscillatorChain>> {
    let system = file.build_system(Arc::clone(&channel))?;
    let parameters = file.parameters()?;
    let update = file.update_fn()?;
    let config = file.sweep_config(num_cpus)?.autorun(false);

    let dimension = system.dimension();
    info!(
        subsystems = system.subsystem_count(),
        dimension,
        points = parameters.total_points(),
        "building sweep"
    );

    let mut sweep = ParameterSweep::new(system, parameters, update, config, channel)?;
    if file.evals_count.min(dimension) >= 2 {
        sweep = sweep.with_generator(
            LOWEST_TRANSITION,
            custom_sweep(|ctx: &mut SweepContext<'_, OscillatorChain>| {
                let dressed = ctx.data().dressed_esys()?;
                Ok(SweepResult::Scalar(
                    dressed.map(|esys| esys.eigenvalues[1] - esys.eigenvalues[0]),
                ))
            }),
        );
    }
    sweep.run()?;
    Ok(sweep)
}

/// Read a YAML sweep file, run it and write the JSON envelope to `output`
pub fn run_file(
    config_path: &Path,
    output_path: &Path,
    num_cpus: Option<usize>,
) -> color_eyre::Result<SweepOutput> {
    let yaml = std::fs::read_to_string(config_path)
        .wrap_err_with(|| format!("failed to read {}", config_path.display()))?;
    let file = SweepFile::from_yaml(&yaml)?;

    let channel = Arc::new(NotificationChannel::new());
    let sweep = run_sweep(&file, num_cpus, channel)?;

    let output = SweepOutput {
        generated_at: Timestamp::now(),
        subsystems: sweep.hilbertspace().subsystem_names(),
        record: sweep.to_record(),
    };
    atomic_write(output_path, &output.to_json()?)
        .wrap_err_with(|| format!("failed to write {}", output_path.display()))?;

    info!(
        output = %output_path.display(),
        results = output.record.data.len(),
        "sweep written"
    );
    Ok(output)
}
