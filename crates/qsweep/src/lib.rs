//! Command-line front end for qsweep.
//!
//! Reads a YAML description of coupled anharmonic oscillators and the
//! parameter axes to sweep, runs the sweep with `qsweep_core` and writes the
//! results as JSON.

pub mod config;
pub mod io;
pub mod logging;
pub mod model;
pub mod runner;

pub use config::{ConfigError, SweepFile};
pub use logging::init_logging;
pub use model::{Coupling, Oscillator, OscillatorChain};
pub use runner::{SweepOutput, run_file, run_sweep};
