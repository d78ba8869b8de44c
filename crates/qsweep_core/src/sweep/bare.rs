//! Bare (per-subsystem) spectrum sweep.
//!
//! Each subsystem is solved on a reduced grid in which every axis that does
//! not affect it is collapsed to its first value. The reduced results are
//! then replicated back along the collapsed axes so that all subsystems share
//! the full grid shape before they are stacked.

use tracing::debug;

use crate::error::Result;
use crate::executor::Executor;
use crate::grid::{Dimension, NamedArray};
use crate::parameters::Parameters;
use crate::system::{Eigensystem, QuantumSystem, SubsysUpdateInfo, UpdateFn};

/// Name of the leading dimension of the bare result
pub const SUBSYS_DIM: &str = "subsys";

/// Axes that leave the bare spectrum of `subsystem` unchanged, in axis order.
///
/// Without an update map every axis is assumed to matter. With one, an axis
/// is skipped unless its entry lists the subsystem.
pub fn paramnames_no_subsys_update(
    parameters: &Parameters,
    subsys_update_info: Option<&SubsysUpdateInfo>,
    subsystem: usize,
) -> Vec<String> {
    let Some(info) = subsys_update_info else {
        return Vec::new();
    };
    parameters
        .names()
        .iter()
        .filter(|name| {
            info.get(name.as_str())
                .is_none_or(|affected| !affected.contains(&subsystem))
        })
        .cloned()
        .collect()
}

/// Bare spectrum of one subsystem over the full grid.
///
/// Result dims are the parameter axes in current order.
pub fn subsys_bare_spectrum_sweep<H>(
    hilbertspace: &mut H,
    parameters: &Parameters,
    update: &UpdateFn<H>,
    subsys_update_info: Option<&SubsysUpdateInfo>,
    subsystem: usize,
    executor: &Executor,
) -> Result<NamedArray<Eigensystem>>
where
    H: QuantumSystem + Clone + Send + Sync,
{
    let fixed = paramnames_no_subsys_update(parameters, subsys_update_info, subsystem);
    let reduced = parameters.create_reduced(&fixed, None)?;
    let evals_count = hilbertspace.truncated_dim(subsystem);

    let points: Vec<Vec<f64>> = reduced.grid_points().collect();
    debug!(
        subsystem,
        fixed = ?fixed,
        points = points.len(),
        full_points = parameters.total_points(),
        "bare sweep on reduced grid"
    );

    let spectra = executor.map(hilbertspace, points, |system, point| {
        update(system, &point)?;
        system.subsystem_eigensys(subsystem, evals_count)
    })?;
    let mut array = NamedArray::try_from_data(reduced.dimensions(), spectra)?;

    // Broadcast the collapsed axes back to full length
    for name in &fixed {
        let axis = parameters.index_by_name(name)?;
        let labels = parameters.get_by_name(name)?.to_vec();
        array = array.repeat_axis(axis, labels.len(), labels)?;
    }
    Ok(array)
}

/// Bare spectra of all subsystems, dims `(subsys, axis1, ..., axisN)`
pub fn bare_spectrum_sweep<H>(
    hilbertspace: &mut H,
    parameters: &Parameters,
    update: &UpdateFn<H>,
    subsys_update_info: Option<&SubsysUpdateInfo>,
    executor: &Executor,
) -> Result<NamedArray<Eigensystem>>
where
    H: QuantumSystem + Clone + Send + Sync,
{
    let count = hilbertspace.subsystem_count();
    if count == 0 {
        let mut dims = vec![Dimension::indexed(SUBSYS_DIM, 0)];
        dims.extend(parameters.dimensions());
        return NamedArray::try_from_data(dims, Vec::new());
    }

    let per_subsystem = (0..count)
        .map(|subsystem| {
            subsys_bare_spectrum_sweep(
                hilbertspace,
                parameters,
                update,
                subsys_update_info,
                subsystem,
                executor,
            )
        })
        .collect::<Result<Vec<_>>>()?;
    NamedArray::stack(per_subsystem, Dimension::indexed(SUBSYS_DIM, count))
}
