//! Dressed (composite) spectrum sweep over the full grid.

use crate::error::{Result, SweepError};
use crate::executor::Executor;
use crate::grid::NamedArray;
use crate::parameters::Parameters;
use crate::sweep::data::BARE_ESYS;
use crate::system::{Eigensystem, QuantumSystem, UpdateFn};

/// Dressed spectra, dims `(axis1, ..., axisN)`.
///
/// `bare` must be the completed bare result of the same parameters; every
/// composite solve receives the bare eigensystems at its own grid point.
pub fn dressed_spectrum_sweep<H>(
    hilbertspace: &mut H,
    parameters: &Parameters,
    update: &UpdateFn<H>,
    bare: &NamedArray<Eigensystem>,
    evals_count: usize,
    executor: &Executor,
) -> Result<NamedArray<Eigensystem>>
where
    H: QuantumSystem + Clone + Send + Sync,
{
    let subsystems = hilbertspace.subsystem_count();
    let indices: Vec<Vec<usize>> = parameters.grid_indices().collect();

    let spectra = executor.map(hilbertspace, indices, |system, index| {
        let point = parameters.get_point(&index)?;
        update(system, &point)?;
        let hint = bare_hint(bare, subsystems, &index)?;
        system.eigensys(evals_count, &hint)
    })?;
    NamedArray::try_from_data(parameters.dimensions(), spectra)
}

/// Bare eigensystem of every subsystem at one grid point, in subsystem order
fn bare_hint<'a>(
    bare: &'a NamedArray<Eigensystem>,
    subsystems: usize,
    index: &[usize],
) -> Result<Vec<&'a Eigensystem>> {
    let mut key = Vec::with_capacity(index.len() + 1);
    (0..subsystems)
        .map(|subsystem| {
            key.clear();
            key.push(subsystem);
            key.extend_from_slice(index);
            bare.get(&key)
                .ok_or_else(|| SweepError::MissingResult(format!("{BARE_ESYS}{key:?}")))
        })
        .collect()
}
