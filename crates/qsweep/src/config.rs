//! YAML description of a sweep over the built-in oscillator model.
//!
//! ```yaml
//! oscillators:
//!   - name: qubit
//!     frequency: 5.0
//!     anharmonicity: 0.25
//!     truncated_dim: 4
//!   - name: resonator
//!     frequency: 6.0
//!     truncated_dim: 3
//! couplings:
//!   - between: [qubit, resonator]
//!     strength: 0.1
//! axes:
//!   - name: qubit_freq
//!     target:
//!       type: frequency
//!       oscillator: qubit
//!     min: 4.5
//!     max: 5.5
//!     steps: 11
//! evals_count: 8
//! subsys_update:
//!   qubit_freq: [qubit]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use qsweep_core::{NotificationChannel, Parameters, SweepConfig, UpdateFn};
use serde::{Deserialize, Serialize};

use crate::model::{Oscillator, OscillatorChain};

/// Errors raised while reading or resolving a sweep file
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The YAML could not be parsed into a sweep file
    Parse(String),
    /// The model has no oscillators
    NoOscillators,
    /// Two oscillators or two axes share a name
    DuplicateName(String),
    /// A coupling, target or update entry names an oscillator that does not exist
    UnknownOscillator(String),
    /// A coupling joins an oscillator to itself
    SelfCoupling(String),
    /// An axis target points past the end of the coupling list
    UnknownCoupling { axis: String, index: usize },
    /// An update entry names an axis that does not exist
    UnknownAxis(String),
    /// An axis has no values, or gives both explicit values and a range
    InvalidAxis { axis: String, reason: String },
    /// An oscillator was given a zero dimension
    InvalidDimension(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "invalid sweep file: {msg}"),
            ConfigError::NoOscillators => write!(f, "the model needs at least one oscillator"),
            ConfigError::DuplicateName(name) => write!(f, "name '{name}' is used twice"),
            ConfigError::UnknownOscillator(name) => write!(f, "unknown oscillator '{name}'"),
            ConfigError::SelfCoupling(name) => {
                write!(f, "oscillator '{name}' cannot be coupled to itself")
            }
            ConfigError::UnknownCoupling { axis, index } => {
                write!(f, "axis '{axis}' targets coupling {index}, which does not exist")
            }
            ConfigError::UnknownAxis(name) => write!(f, "unknown axis '{name}'"),
            ConfigError::InvalidAxis { axis, reason } => write!(f, "axis '{axis}': {reason}"),
            ConfigError::InvalidDimension(name) => {
                write!(f, "oscillator '{name}' needs a truncated dimension of at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillatorData {
    pub name: String,
    pub frequency: f64,
    #[serde(default)]
    pub anharmonicity: f64,
    pub truncated_dim: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingData {
    /// Names of the two coupled oscillators
    pub between: [String; 2],
    pub strength: f64,
}

/// Model quantity an axis drives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetData {
    Frequency { oscillator: String },
    Anharmonicity { oscillator: String },
    /// Strength of the coupling at `index` in the `couplings` list
    Coupling { index: usize },
}

/// One sweep axis, given either as explicit `values` or as `min`/`max`/`steps`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisData {
    pub name: String,
    pub target: TargetData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<usize>,
}

impl AxisData {
    /// Grid values of this axis; a range is sampled evenly with both ends included
    pub fn values(&self) -> Result<Vec<f64>, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidAxis {
            axis: self.name.clone(),
            reason: reason.to_string(),
        };
        let has_range = self.min.is_some() || self.max.is_some() || self.steps.is_some();
        match (&self.values, has_range) {
            (Some(_), true) => Err(invalid("give either values or min/max/steps, not both")),
            (Some(values), false) if values.is_empty() => Err(invalid("values are empty")),
            (Some(values), false) => Ok(values.clone()),
            (None, _) => {
                let (Some(min), Some(max), Some(steps)) = (self.min, self.max, self.steps) else {
                    return Err(invalid("a range needs min, max and steps"));
                };
                match steps {
                    0 => Err(invalid("steps must be at least 1")),
                    1 => Ok(vec![min]),
                    _ => {
                        let step = (max - min) / (steps - 1) as f64;
                        Ok((0..steps).map(|i| min + step * i as f64).collect())
                    }
                }
            }
        }
    }
}

fn default_evals_count() -> usize {
    6
}

fn default_num_cpus() -> usize {
    1
}

/// Complete sweep file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFile {
    pub oscillators: Vec<OscillatorData>,
    #[serde(default)]
    pub couplings: Vec<CouplingData>,
    pub axes: Vec<AxisData>,
    #[serde(default = "default_evals_count")]
    pub evals_count: usize,
    #[serde(default = "default_num_cpus")]
    pub num_cpus: usize,
    /// Oscillators affected by each axis; axes left out affect none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsys_update: Option<BTreeMap<String, Vec<String>>>,
}

/// Where an axis value lands in the model, by position
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Frequency(usize),
    Anharmonicity(usize),
    Coupling(usize),
}

impl SweepFile {
    /// Parse and validate a YAML sweep file
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let file: SweepFile =
            serde_saphyr::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        file.validate()?;
        Ok(file)
    }

    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    /// Check names, references and axis definitions
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oscillators.is_empty() {
            return Err(ConfigError::NoOscillators);
        }
        let mut seen: Vec<&str> = Vec::new();
        for oscillator in &self.oscillators {
            if seen.contains(&oscillator.name.as_str()) {
                return Err(ConfigError::DuplicateName(oscillator.name.clone()));
            }
            if oscillator.truncated_dim == 0 {
                return Err(ConfigError::InvalidDimension(oscillator.name.clone()));
            }
            seen.push(oscillator.name.as_str());
        }
        for coupling in &self.couplings {
            let [first, second] = &coupling.between;
            let a = self.oscillator_index(first)?;
            let b = self.oscillator_index(second)?;
            if a == b {
                return Err(ConfigError::SelfCoupling(first.clone()));
            }
        }

        let mut axis_names: Vec<&str> = Vec::new();
        for axis in &self.axes {
            if axis_names.contains(&axis.name.as_str()) {
                return Err(ConfigError::DuplicateName(axis.name.clone()));
            }
            axis_names.push(axis.name.as_str());
            axis.values()?;
            self.resolve_target(axis)?;
        }

        if let Some(update) = &self.subsys_update {
            for (axis, oscillators) in update {
                if !axis_names.contains(&axis.as_str()) {
                    return Err(ConfigError::UnknownAxis(axis.clone()));
                }
                for name in oscillators {
                    self.oscillator_index(name)?;
                }
            }
        }
        Ok(())
    }

    fn oscillator_index(&self, name: &str) -> Result<usize, ConfigError> {
        self.oscillators
            .iter()
            .position(|o| o.name == name)
            .ok_or_else(|| ConfigError::UnknownOscillator(name.to_string()))
    }

    fn resolve_target(&self, axis: &AxisData) -> Result<Target, ConfigError> {
        match &axis.target {
            TargetData::Frequency { oscillator } => {
                Ok(Target::Frequency(self.oscillator_index(oscillator)?))
            }
            TargetData::Anharmonicity { oscillator } => {
                Ok(Target::Anharmonicity(self.oscillator_index(oscillator)?))
            }
            TargetData::Coupling { index } if *index < self.couplings.len() => {
                Ok(Target::Coupling(*index))
            }
            TargetData::Coupling { index } => Err(ConfigError::UnknownCoupling {
                axis: axis.name.clone(),
                index: *index,
            }),
        }
    }

    /// Build the system handle bound to `channel`
    pub fn build_system(
        &self,
        channel: Arc<NotificationChannel>,
    ) -> Result<OscillatorChain, ConfigError> {
        let mut system = OscillatorChain::new(channel);
        for data in &self.oscillators {
            system = system.with_oscillator(
                Oscillator::new(&data.name, data.frequency, data.truncated_dim)
                    .with_anharmonicity(data.anharmonicity),
            );
        }
        for coupling in &self.couplings {
            let [first, second] = &coupling.between;
            let a = self.oscillator_index(first)?;
            let b = self.oscillator_index(second)?;
            system = system
                .with_coupling(a, b, coupling.strength)
                .map_err(|_| ConfigError::SelfCoupling(first.clone()))?;
        }
        Ok(system)
    }

    /// Axis values in file order
    pub fn parameters(&self) -> Result<Parameters, ConfigError> {
        let axes = self
            .axes
            .iter()
            .map(|axis| Ok((axis.name.clone(), axis.values()?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Parameters::new(axes))
    }

    /// Update function writing each coordinate of a grid point to its target
    pub fn update_fn(&self) -> Result<UpdateFn<OscillatorChain>, ConfigError> {
        let targets = self
            .axes
            .iter()
            .map(|axis| self.resolve_target(axis))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Arc::new(move |system: &mut OscillatorChain, point: &[f64]| -> qsweep_core::Result<()> {
            for (target, &value) in targets.iter().zip(point) {
                match *target {
                    Target::Frequency(i) => system.set_frequency(i, value)?,
                    Target::Anharmonicity(i) => system.set_anharmonicity(i, value)?,
                    Target::Coupling(i) => system.set_coupling_strength(i, value)?,
                }
            }
            Ok(())
        }))
    }

    /// Sweep settings; `num_cpus` overrides the file's worker count when given
    pub fn sweep_config(&self, num_cpus: Option<usize>) -> Result<SweepConfig, ConfigError> {
        let mut config = SweepConfig::new()
            .evals_count(self.evals_count)
            .num_cpus(num_cpus.unwrap_or(self.num_cpus));
        if let Some(update) = &self.subsys_update {
            // Axes without an entry affect no oscillator
            for axis in &self.axes {
                let names = update.get(&axis.name).map(Vec::as_slice).unwrap_or_default();
                let indices = names
                    .iter()
                    .map(|name| self.oscillator_index(name))
                    .collect::<Result<Vec<_>, ConfigError>>()?;
                config = config.subsys_update(axis.name.clone(), indices);
            }
        }
        Ok(config)
    }
}
