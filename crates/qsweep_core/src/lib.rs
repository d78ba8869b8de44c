//! Parameter-sweep engine for spectral analysis of composite quantum systems
//!
//! For every point of the grid spanned by a set of named parameter axes, a
//! sweep computes:
//! - bare eigensystems of each subsystem, skipping axes that do not affect it
//! - dressed eigensystems of the composite system
//! - a lookup table from bare product-state labels to dressed indices
//! - any number of user-defined custom results
//!
//! Results are dense labeled arrays ([`NamedArray`]) whose dimensions follow
//! the axis order of the [`Parameters`]. A [`NotificationChannel`] connects the
//! system handle to its sweeps so that later changes to the system mark the
//! stored lookup data as out of sync.
//!
//! ```ignore
//! use qsweep_core::{NotificationChannel, ParameterSweep, Parameters, SweepBase, SweepConfig};
//!
//! let channel = Arc::new(NotificationChannel::new());
//! let system = MySystem::new(Arc::clone(&channel));
//! let parameters = Parameters::new([("flux", linspace(0.0, 1.0, 51))]);
//! let sweep = ParameterSweep::new(system, parameters, update, SweepConfig::default(), channel)?;
//!
//! let qubit_levels = sweep.select(&[]).bare_specdata_list()?;
//! ```
//!
//! With the `parallel` feature (on by default), sweeps configured with more
//! than one CPU evaluate grid points on a rayon pool.

#![warn(clippy::all)]

pub mod dispatch;
pub mod error;
pub mod executor;
pub mod grid;
pub mod parameters;
pub mod spectrum;
pub mod sweep;
pub mod system;

#[cfg(test)]
mod tests;

pub use dispatch::{DispatchClient, DispatchEvent, DispatchGuard, NotificationChannel, SenderId};
pub use error::{Result, SweepError};
pub use grid::{Dimension, GridIndices, NamedArray, Selector};
pub use parameters::{AxisOrder, Parameters};
pub use spectrum::SpectrumData;
pub use sweep::{
    MaxOverlap, ParameterSweep, StateMatcher, StoredSweep, SweepBase, SweepConfig, SweepContext,
    SweepData, SweepGenerator, SweepRecord, SweepResult, SweepView, custom_sweep, per_point,
};
pub use system::{Eigensystem, QuantumSystem, StateVector, SubsysUpdateInfo, UpdateFn};
pub use num_complex::Complex64;
