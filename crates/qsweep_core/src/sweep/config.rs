//! Configuration of a parameter sweep.

use serde::{Deserialize, Serialize};

use crate::system::SubsysUpdateInfo;

/// Settings of a [`crate::sweep::ParameterSweep`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Number of dressed eigenpairs to keep per point. The number of bare
    /// eigenpairs per subsystem is that subsystem's truncated dimension.
    #[serde(default = "default_evals_count")]
    pub evals_count: usize,
    /// Worker count for point-level dispatch; 1 runs sequentially on the live handle
    #[serde(default = "default_num_cpus")]
    pub num_cpus: usize,
    /// Run the sweep as part of construction
    #[serde(default = "default_autorun")]
    pub autorun: bool,
    /// Which subsystems each axis affects. `None` treats every axis as
    /// affecting every subsystem.
    #[serde(default)]
    pub subsys_update_info: Option<SubsysUpdateInfo>,
}

fn default_evals_count() -> usize {
    6
}

fn default_num_cpus() -> usize {
    1
}

fn default_autorun() -> bool {
    true
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            evals_count: default_evals_count(),
            num_cpus: default_num_cpus(),
            autorun: default_autorun(),
            subsys_update_info: None,
        }
    }
}

impl SweepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evals_count(mut self, evals_count: usize) -> Self {
        self.evals_count = evals_count;
        self
    }

    pub fn num_cpus(mut self, num_cpus: usize) -> Self {
        self.num_cpus = num_cpus;
        self
    }

    pub fn autorun(mut self, autorun: bool) -> Self {
        self.autorun = autorun;
        self
    }

    /// Declare that `axis` only affects the bare spectra of `subsystems`
    pub fn subsys_update(mut self, axis: impl Into<String>, subsystems: Vec<usize>) -> Self {
        self.subsys_update_info
            .get_or_insert_with(SubsysUpdateInfo::default)
            .insert(axis.into(), subsystems);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SweepConfig::default();
        assert_eq!(config.evals_count, 6);
        assert_eq!(config.num_cpus, 1);
        assert!(config.autorun);
        assert!(config.subsys_update_info.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let config = SweepConfig::new()
            .evals_count(10)
            .num_cpus(4)
            .autorun(false)
            .subsys_update("flux", vec![0])
            .subsys_update("g", vec![]);
        assert_eq!(config.evals_count, 10);
        assert_eq!(config.num_cpus, 4);
        assert!(!config.autorun);
        let info = config.subsys_update_info.unwrap();
        assert_eq!(info["flux"], vec![0]);
        assert!(info["g"].is_empty());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: SweepConfig = serde_json::from_str(r#"{"evals_count": 3}"#).unwrap();
        assert_eq!(config.evals_count, 3);
        assert_eq!(config.num_cpus, 1);
        assert!(config.autorun);
    }
}
