//! Read access shared by live and stored sweeps.
//!
//! [`SweepBase::get_result`] reads a whole named result. [`SweepBase::select`]
//! narrows the parameter grid with one [`Selector`] per axis and returns a
//! [`SweepView`] whose methods interpret the selection: spectral data along
//! a single free axis, or lookup queries at a fully fixed point.
//!
//! ```ignore
//! let view = sweep.select(&[Selector::All, Selector::Index(3)]);
//! if view.is_single_sweep() {
//!     let per_subsystem = view.bare_specdata_list()?;
//! }
//! let e01 = sweep
//!     .select(&[Selector::Index(0), Selector::Index(3)])
//!     .energy_by_bare_index(&[0, 1])?;
//! ```

use tracing::warn;

use crate::error::{Result, SweepError};
use crate::grid::{NamedArray, Selector};
use crate::parameters::Parameters;
use crate::spectrum::SpectrumData;
use crate::sweep::data::{DRESSED_ESYS, DRESSED_INDICES, SweepData, SweepResult};
use crate::system::{Eigensystem, QuantumSystem, StateVector, product_index, product_label};

/// Common read API of [`crate::sweep::ParameterSweep`] and [`crate::sweep::StoredSweep`]
pub trait SweepBase {
    type System: QuantumSystem;

    fn parameters(&self) -> &Parameters;
    fn data(&self) -> &SweepData;
    fn hilbertspace(&self) -> &Self::System;
    fn evals_count(&self) -> usize;

    /// Whether the system or the sweep changed after the lookup table was built
    fn is_out_of_sync(&self) -> bool;

    fn get_result(&self, name: &str) -> Result<&SweepResult> {
        self.data().get(name)
    }

    fn get_subsys_index(&self, name: &str) -> Result<usize> {
        self.hilbertspace()
            .subsystem_index(name)
            .ok_or_else(|| SweepError::UnknownSubsystem(name.to_string()))
    }

    fn subsystem_count(&self) -> usize {
        self.hilbertspace().subsystem_count()
    }

    /// Product-space dimensions, one per subsystem
    fn bare_dims(&self) -> Vec<usize> {
        let system = self.hilbertspace();
        (0..system.subsystem_count())
            .map(|i| system.truncated_dim(i))
            .collect()
    }

    fn select(&self, selectors: &[Selector]) -> SweepView<'_, Self>
    where
        Self: Sized,
    {
        SweepView {
            sweep: self,
            selectors: selectors.to_vec(),
        }
    }
}

/// Selection over the parameter grid of a sweep. Missing trailing selectors
/// select whole axes.
#[derive(Debug)]
pub struct SweepView<'a, S> {
    sweep: &'a S,
    selectors: Vec<Selector>,
}

impl<'a, S: SweepBase> SweepView<'a, S> {
    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    /// Number of axes left unfixed by the selection
    pub fn free_axes(&self) -> usize {
        let axes = self.sweep.parameters().len();
        let fixed = self.selectors.iter().filter(|s| !s.is_free()).count();
        axes.saturating_sub(fixed)
    }

    /// True iff the selection leaves exactly one axis free
    pub fn is_single_sweep(&self) -> bool {
        self.selectors.len() <= self.sweep.parameters().len() && self.free_axes() == 1
    }

    /// Bare spectral data of every subsystem along the single free axis
    pub fn bare_specdata_list(&self) -> Result<Vec<SpectrumData>> {
        self.require_free_axes(1)?;
        let bare = self.sweep.data().bare_esys()?;
        let names = self.sweep.hilbertspace().subsystem_names();

        let mut selectors = Vec::with_capacity(self.selectors.len() + 1);
        names
            .into_iter()
            .enumerate()
            .map(|(subsystem, name)| {
                selectors.clear();
                selectors.push(Selector::Index(subsystem));
                selectors.extend(self.selectors.iter().cloned());
                let slice = bare.select(&selectors)?;
                single_axis_specdata(&slice, Some(name))
            })
            .collect()
    }

    /// Dressed spectral data along the single free axis
    pub fn dressed_specdata(&self) -> Result<SpectrumData> {
        self.require_free_axes(1)?;
        let slice = self.sweep.data().dressed_esys()?.select(&self.selectors)?;
        single_axis_specdata(&slice, None)
    }

    /// Dressed eigensystem at the selected point
    pub fn eigensys(&self) -> Result<&'a Eigensystem> {
        let point = self.point()?;
        let dressed = self.sweep.data().dressed_esys()?;
        at_point(dressed, DRESSED_ESYS, &point)
    }

    /// Bare eigensystem of one subsystem at the selected point
    pub fn bare_eigensys(&self, subsystem: usize) -> Result<&'a Eigensystem> {
        let point = self.point()?;
        let bare = self.sweep.data().bare_esys()?;
        let mut key = Vec::with_capacity(point.len() + 1);
        key.push(subsystem);
        key.extend(point);
        bare.get(&key).ok_or(SweepError::PointIndexOutOfRange {
            axis: "subsys".to_string(),
            index: subsystem,
            count: self.sweep.subsystem_count(),
        })
    }

    pub fn bare_eigenenergies(&self, subsystem: usize) -> Result<&'a [f64]> {
        Ok(&self.bare_eigensys(subsystem)?.eigenvalues)
    }

    pub fn bare_eigenstates(&self, subsystem: usize) -> Result<&'a [StateVector]> {
        Ok(&self.bare_eigensys(subsystem)?.eigenvectors)
    }

    /// Dressed index of the product state `label`; `None` if no dressed state matches
    pub fn dressed_index(&self, label: &[usize]) -> Result<Option<usize>> {
        let flat = product_index(label, &self.sweep.bare_dims())
            .ok_or_else(|| SweepError::InvalidLabel(label.to_vec()))?;
        let table = self.lookup_entry()?;
        Ok(table.get(flat).copied().flatten())
    }

    /// Product-state label assigned to dressed state `dressed_index`
    pub fn bare_index(&self, dressed_index: usize) -> Result<Option<Vec<usize>>> {
        let table = self.lookup_entry()?;
        let bare_dims = self.sweep.bare_dims();
        Ok(table
            .iter()
            .position(|entry| *entry == Some(dressed_index))
            .and_then(|flat| product_label(flat, &bare_dims)))
    }

    pub fn energy_by_dressed_index(&self, dressed_index: usize) -> Result<f64> {
        let esys = self.eigensys()?;
        esys.eigenvalues
            .get(dressed_index)
            .copied()
            .ok_or(SweepError::PointIndexOutOfRange {
                axis: DRESSED_ESYS.to_string(),
                index: dressed_index,
                count: esys.len(),
            })
    }

    /// Dressed energy of the state matching product state `label`
    pub fn energy_by_bare_index(&self, label: &[usize]) -> Result<Option<f64>> {
        match self.dressed_index(label)? {
            Some(index) => self.energy_by_dressed_index(index).map(Some),
            None => Ok(None),
        }
    }

    fn require_free_axes(&self, expected: usize) -> Result<()> {
        let axes = self.sweep.parameters().len();
        if self.selectors.len() > axes {
            return Err(SweepError::DimensionMismatch {
                expected: axes,
                found: self.selectors.len(),
            });
        }
        let free_axes = self.free_axes();
        if free_axes != expected {
            return Err(SweepError::AmbiguousSelection {
                expected,
                free_axes,
            });
        }
        Ok(())
    }

    /// Index tuple of a fully fixed selection
    fn point(&self) -> Result<Vec<usize>> {
        self.require_free_axes(0)?;
        let counts = self.sweep.parameters().counts();
        let names = self.sweep.parameters().names();
        self.selectors
            .iter()
            .zip(counts.iter().zip(names))
            .map(|(selector, (&count, name))| match selector {
                Selector::Index(index) if *index < count => Ok(*index),
                Selector::Index(index) => Err(SweepError::PointIndexOutOfRange {
                    axis: name.clone(),
                    index: *index,
                    count,
                }),
                // Ranges of width one never count as fixed
                Selector::All | Selector::Range(_) => Err(SweepError::AmbiguousSelection {
                    expected: 0,
                    free_axes: self.free_axes(),
                }),
            })
            .collect()
    }

    fn lookup_entry(&self) -> Result<&'a [Option<usize>]> {
        if self.sweep.is_out_of_sync() {
            warn!("sweep data is out of sync with the system; lookup results may be stale");
        }
        let point = self.point()?;
        let table = self.sweep.data().dressed_indices()?;
        at_point(table, DRESSED_INDICES, &point).map(Vec::as_slice)
    }
}

fn at_point<'a, T>(array: &'a NamedArray<T>, name: &str, point: &[usize]) -> Result<&'a T> {
    array
        .get(point)
        .ok_or_else(|| SweepError::MissingResult(format!("{name}{point:?}")))
}

fn single_axis_specdata(
    slice: &NamedArray<Eigensystem>,
    subsystem: Option<String>,
) -> Result<SpectrumData> {
    SpectrumData::from_array(slice, subsystem).ok_or(SweepError::AmbiguousSelection {
        expected: 1,
        free_axes: slice.ndim(),
    })
}
