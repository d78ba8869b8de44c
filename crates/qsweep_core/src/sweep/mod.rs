//! Parameter sweeps over composite quantum systems.
//!
//! A [`ParameterSweep`] walks the full grid spanned by its [`crate::Parameters`]
//! and fills a [`SweepData`] store with
//!
//! - `bare_esys`: per-subsystem eigensystems, dims `(subsys, axis1, ..., axisN)`
//! - `esys`: composite eigensystems, dims `(axis1, ..., axisN)`
//! - `dressed_indices`: bare product-state label to dressed index, per point
//! - one entry per registered custom sweep
//!
//! Axes listed in the subsystem update map as not affecting a subsystem are
//! collapsed for that subsystem's bare solves and broadcast back afterwards.
//! A [`StoredSweep`] exposes the same read API over a deserialized
//! [`SweepRecord`].

mod bare;
mod config;
mod data;
mod dressed;
mod lookup;
mod parameter_sweep;
mod stored;
mod view;

pub use bare::{
    SUBSYS_DIM, bare_spectrum_sweep, paramnames_no_subsys_update, subsys_bare_spectrum_sweep,
};
pub use config::SweepConfig;
pub use data::{BARE_ESYS, DRESSED_ESYS, DRESSED_INDICES, SweepData, SweepRecord, SweepResult};
pub use dressed::dressed_spectrum_sweep;
pub use lookup::{MaxOverlap, StateMatcher, SyncTracker, generate_lookup};
pub use parameter_sweep::{
    ParameterSweep, SweepContext, SweepGenerator, custom_sweep, per_point,
};
pub use stored::StoredSweep;
pub use view::{SweepBase, SweepView};
