//! Result store of a sweep and its persisted form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::grid::{Dimension, NamedArray};
use crate::parameters::Parameters;
use crate::system::Eigensystem;

/// Key of the bare spectra, dims `(subsys, axis1, ..., axisN)`
pub const BARE_ESYS: &str = "bare_esys";
/// Key of the dressed spectra, dims `(axis1, ..., axisN)`
pub const DRESSED_ESYS: &str = "esys";
/// Key of the bare-label to dressed-index lookup table, dims `(axis1, ..., axisN)`
pub const DRESSED_INDICES: &str = "dressed_indices";

/// One named result of a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SweepResult {
    /// Eigensystem per grid point
    Spectrum(NamedArray<Eigensystem>),
    /// Dressed index per product-state label per grid point; `None` marks no match
    Indices(NamedArray<Vec<Option<usize>>>),
    /// One number per grid point
    Scalar(NamedArray<f64>),
    /// One vector per grid point
    Vector(NamedArray<Vec<f64>>),
}

impl SweepResult {
    pub fn kind(&self) -> &'static str {
        match self {
            SweepResult::Spectrum(_) => "spectrum",
            SweepResult::Indices(_) => "indices",
            SweepResult::Scalar(_) => "scalar",
            SweepResult::Vector(_) => "vector",
        }
    }

    pub fn dims(&self) -> &[Dimension] {
        match self {
            SweepResult::Spectrum(a) => a.dims(),
            SweepResult::Indices(a) => a.dims(),
            SweepResult::Scalar(a) => a.dims(),
            SweepResult::Vector(a) => a.dims(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            SweepResult::Spectrum(a) => a.shape(),
            SweepResult::Indices(a) => a.shape(),
            SweepResult::Scalar(a) => a.shape(),
            SweepResult::Vector(a) => a.shape(),
        }
    }

    pub fn as_spectrum(&self) -> Option<&NamedArray<Eigensystem>> {
        match self {
            SweepResult::Spectrum(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_indices(&self) -> Option<&NamedArray<Vec<Option<usize>>>> {
        match self {
            SweepResult::Indices(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&NamedArray<f64>> {
        match self {
            SweepResult::Scalar(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&NamedArray<Vec<f64>>> {
        match self {
            SweepResult::Vector(a) => Some(a),
            _ => None,
        }
    }
}

impl NamedArray<Eigensystem> {
    /// Eigenvalue component of every element, with the same dimensions
    pub fn eigenvalues(&self) -> NamedArray<Vec<f64>> {
        self.map(|esys| esys.eigenvalues.clone())
    }
}

/// Named sweep results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepData {
    results: BTreeMap<String, SweepResult>,
}

impl SweepData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result, returning the one previously stored under that name
    pub fn insert(&mut self, name: impl Into<String>, result: SweepResult) -> Option<SweepResult> {
        self.results.insert(name.into(), result)
    }

    pub fn get(&self, name: &str) -> Result<&SweepResult> {
        self.results
            .get(name)
            .ok_or_else(|| SweepError::MissingResult(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.results.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn bare_esys(&self) -> Result<&NamedArray<Eigensystem>> {
        self.spectrum(BARE_ESYS)
    }

    pub fn dressed_esys(&self) -> Result<&NamedArray<Eigensystem>> {
        self.spectrum(DRESSED_ESYS)
    }

    pub fn dressed_indices(&self) -> Result<&NamedArray<Vec<Option<usize>>>> {
        let result = self.get(DRESSED_INDICES)?;
        result
            .as_indices()
            .ok_or_else(|| kind_error(DRESSED_INDICES, "indices", result))
    }

    pub fn spectrum(&self, name: &str) -> Result<&NamedArray<Eigensystem>> {
        let result = self.get(name)?;
        result
            .as_spectrum()
            .ok_or_else(|| kind_error(name, "spectrum", result))
    }

    pub fn scalar(&self, name: &str) -> Result<&NamedArray<f64>> {
        let result = self.get(name)?;
        result
            .as_scalar()
            .ok_or_else(|| kind_error(name, "scalar", result))
    }

    pub fn vector(&self, name: &str) -> Result<&NamedArray<Vec<f64>>> {
        let result = self.get(name)?;
        result
            .as_vector()
            .ok_or_else(|| kind_error(name, "vector", result))
    }
}

fn kind_error(name: &str, expected: &'static str, found: &SweepResult) -> SweepError {
    SweepError::ResultKind {
        name: name.to_string(),
        expected,
        found: found.kind(),
    }
}

/// Serializable snapshot of a completed sweep.
///
/// The system handle is not part of the record; it is bound again when the
/// record is turned back into a [`crate::sweep::StoredSweep`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    pub paramvals_by_name: Parameters,
    pub evals_count: usize,
    pub data: SweepData,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_result() -> SweepResult {
        let dims = vec![Dimension::new("p", vec![0.0, 1.0])];
        SweepResult::Scalar(NamedArray::from_data(dims, vec![1.5, 2.5]).unwrap())
    }

    #[test]
    fn test_typed_getters() {
        let mut data = SweepData::new();
        data.insert("energy", scalar_result());

        assert_eq!(data.scalar("energy").unwrap().data(), &[1.5, 2.5]);
        assert_eq!(
            data.spectrum("energy"),
            Err(SweepError::ResultKind {
                name: "energy".to_string(),
                expected: "spectrum",
                found: "scalar",
            })
        );
        assert_eq!(
            data.bare_esys(),
            Err(SweepError::MissingResult(BARE_ESYS.to_string()))
        );
    }

    #[test]
    fn test_eigenvalue_projection_keeps_dims() {
        let dims = vec![Dimension::new("p", vec![0.0, 1.0])];
        let spectra = NamedArray::from_data(
            dims,
            vec![
                Eigensystem::from_real(vec![0.0, 1.0], vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
                Eigensystem::from_real(vec![0.0, 2.0], vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
            ],
        )
        .unwrap();
        let evals = spectra.eigenvalues();
        assert_eq!(evals.dim_names(), vec!["p"]);
        assert_eq!(evals.get(&[1]), Some(&vec![0.0, 2.0]));
    }
}
