//! Named, ordered parameter axes.
//!
//! [`Parameters`] owns one value list per axis name together with an ordering
//! of the names. The ordering decides the dimension order of every array a
//! sweep produces; [`Parameters::reorder`] changes it without touching the
//! values of any axis.

use std::ops::{Bound, Range, RangeBounds};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::grid::{Dimension, GridIndices};

/// New axis ordering, given either by names or by current positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisOrder {
    Names(Vec<String>),
    Indices(Vec<usize>),
}

/// Collection of named parameter axes with a stable ordering.
///
/// Invariant: `names` is always a permutation of the keys of `values_by_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, Vec<f64>)>", into = "Vec<(String, Vec<f64>)>")]
pub struct Parameters {
    values_by_name: FxHashMap<String, Vec<f64>>,
    names: Vec<String>,
}

impl Parameters {
    /// Build from `(name, values)` pairs; the pair order becomes the axis order.
    /// A repeated name replaces the earlier values and keeps the first position.
    pub fn new<S: Into<String>>(axes: impl IntoIterator<Item = (S, Vec<f64>)>) -> Self {
        let mut values_by_name = FxHashMap::default();
        let mut names = Vec::new();
        for (name, values) in axes {
            let name = name.into();
            if values_by_name.insert(name.clone(), values).is_none() {
                names.push(name);
            }
        }
        Self {
            values_by_name,
            names,
        }
    }

    /// Build from an unordered map plus an explicit ordering of its keys
    pub fn with_ordering(
        values_by_name: FxHashMap<String, Vec<f64>>,
        names: Vec<String>,
    ) -> Result<Self> {
        if !is_name_permutation(&names, &values_by_name) {
            return Err(SweepError::InvalidOrdering(format!(
                "{names:?} does not name every axis exactly once"
            )));
        }
        Ok(Self {
            values_by_name,
            names,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Axis names in current order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Iterate over the axis value lists in current order
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.names
            .iter()
            .map(move |name| self.values_by_name[name].as_slice())
    }

    pub fn get_by_name(&self, name: &str) -> Result<&[f64]> {
        self.values_by_name
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| SweepError::UnknownAxis(name.to_string()))
    }

    pub fn get_by_index(&self, index: usize) -> Result<&[f64]> {
        let name = self
            .names
            .get(index)
            .ok_or(SweepError::AxisIndexOutOfRange {
                index,
                count: self.len(),
            })?;
        Ok(&self.values_by_name[name])
    }

    /// Value lists of the axes selected by `range`; out-of-range bounds are clamped
    pub fn get_slice(&self, range: impl RangeBounds<usize>) -> Vec<&[f64]> {
        let span = clamp_range(range, self.len());
        self.names[span]
            .iter()
            .map(|name| self.values_by_name[name].as_slice())
            .collect()
    }

    /// Concrete parameter values at the grid point addressed by `indices`
    pub fn get_point(&self, indices: &[usize]) -> Result<Vec<f64>> {
        if indices.len() != self.len() {
            return Err(SweepError::DimensionMismatch {
                expected: self.len(),
                found: indices.len(),
            });
        }
        self.names
            .iter()
            .zip(indices)
            .map(|(name, &index)| {
                let values = &self.values_by_name[name];
                values
                    .get(index)
                    .copied()
                    .ok_or_else(|| SweepError::PointIndexOutOfRange {
                        axis: name.clone(),
                        index,
                        count: values.len(),
                    })
            })
            .collect()
    }

    pub fn index_by_name(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SweepError::UnknownAxis(name.to_string()))
    }

    /// Value lists in current order
    pub fn paramvals_list(&self) -> Vec<&[f64]> {
        self.iter().collect()
    }

    /// Number of values on each axis, in current order
    pub fn counts(&self) -> Vec<usize> {
        self.iter().map(<[f64]>::len).collect()
    }

    pub fn counts_by_name(&self) -> FxHashMap<&str, usize> {
        self.values_by_name
            .iter()
            .map(|(name, values)| (name.as_str(), values.len()))
            .collect()
    }

    /// Index range of each axis, in current order
    pub fn ranges(&self) -> Vec<Range<usize>> {
        self.counts().into_iter().map(|count| 0..count).collect()
    }

    /// Number of points in the full grid
    pub fn total_points(&self) -> usize {
        self.counts().iter().product()
    }

    /// All index tuples of the grid in row-major order (last axis fastest)
    pub fn grid_indices(&self) -> GridIndices {
        GridIndices::new(self.counts())
    }

    /// All value tuples of the grid, in the same order as [`Parameters::grid_indices`]
    pub fn grid_points(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        let lists = self.paramvals_list();
        self.grid_indices().map(move |indices| {
            indices
                .iter()
                .zip(&lists)
                .map(|(&i, values)| values[i])
                .collect()
        })
    }

    /// Change the axis ordering. Axis contents are left untouched.
    pub fn reorder(&mut self, ordering: AxisOrder) -> Result<()> {
        match ordering {
            AxisOrder::Names(names) => {
                if !is_name_permutation(&names, &self.values_by_name) {
                    return Err(SweepError::InvalidOrdering(format!(
                        "{names:?} is not a permutation of {:?}",
                        self.names
                    )));
                }
                self.names = names;
            }
            AxisOrder::Indices(indices) => {
                let mut sorted = indices.clone();
                sorted.sort_unstable();
                if sorted != (0..self.len()).collect::<Vec<_>>() {
                    return Err(SweepError::InvalidOrdering(format!(
                        "{indices:?} is not a permutation of 0..{}",
                        self.len()
                    )));
                }
                self.names = indices.iter().map(|&i| self.names[i].clone()).collect();
            }
        }
        Ok(())
    }

    /// `(name, values)` pairs in current order
    pub fn ordered_dict(&self) -> Vec<(String, Vec<f64>)> {
        self.names
            .iter()
            .map(|name| (name.clone(), self.values_by_name[name].clone()))
            .collect()
    }

    /// One labelled dimension per axis, in current order
    pub fn dimensions(&self) -> Vec<Dimension> {
        self.names
            .iter()
            .map(|name| Dimension::new(name.clone(), self.values_by_name[name].clone()))
            .collect()
    }

    /// Copy of these parameters with the named axes collapsed to a single value.
    ///
    /// Each fixed axis takes the matching entry of `fixed_values` when given,
    /// otherwise its own first value. Other axes and the ordering are kept.
    pub fn create_reduced<S: AsRef<str>>(
        &self,
        fixed_names: &[S],
        fixed_values: Option<&[Vec<f64>]>,
    ) -> Result<Parameters> {
        if let Some(values) = fixed_values
            && values.len() != fixed_names.len()
        {
            return Err(SweepError::DimensionMismatch {
                expected: fixed_names.len(),
                found: values.len(),
            });
        }

        let mut reduced = self.values_by_name.clone();
        for (index, name) in fixed_names.iter().enumerate() {
            let name = name.as_ref();
            let slot = reduced
                .get_mut(name)
                .ok_or_else(|| SweepError::UnknownAxis(name.to_string()))?;
            *slot = match fixed_values {
                Some(values) => values[index].clone(),
                None => slot.first().map(|v| vec![*v]).unwrap_or_default(),
            };
        }

        Ok(Parameters {
            values_by_name: reduced,
            names: self.names.clone(),
        })
    }
}

impl From<Vec<(String, Vec<f64>)>> for Parameters {
    fn from(axes: Vec<(String, Vec<f64>)>) -> Self {
        Parameters::new(axes)
    }
}

impl From<Parameters> for Vec<(String, Vec<f64>)> {
    fn from(parameters: Parameters) -> Self {
        parameters.ordered_dict()
    }
}

fn is_name_permutation(names: &[String], values_by_name: &FxHashMap<String, Vec<f64>>) -> bool {
    if names.len() != values_by_name.len() {
        return false;
    }
    let mut seen = rustc_hash::FxHashSet::default();
    names
        .iter()
        .all(|name| values_by_name.contains_key(name) && seen.insert(name.as_str()))
}

fn clamp_range(range: impl RangeBounds<usize>, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e.saturating_add(1),
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    };
    let end = end.min(len);
    start.min(end)..end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Parameters {
        Parameters::new([
            ("p", vec![1.0, 2.0]),
            ("q", vec![10.0, 20.0, 30.0]),
            ("r", vec![0.5]),
        ])
    }

    #[test]
    fn test_lookup_by_name_index_and_slice() {
        let params = sample();
        assert_eq!(params.len(), 3);
        assert_eq!(params.get_by_name("q").unwrap(), &[10.0, 20.0, 30.0]);
        assert_eq!(params.get_by_index(0).unwrap(), &[1.0, 2.0]);
        assert_eq!(params.get_slice(1..), vec![&[10.0, 20.0, 30.0][..], &[0.5][..]]);
        assert_eq!(params.get_slice(..10).len(), 3);
        assert!(params.get_slice(5..).is_empty());
        assert_eq!(
            params.get_by_name("missing"),
            Err(SweepError::UnknownAxis("missing".to_string()))
        );
        assert!(matches!(
            params.get_by_index(3),
            Err(SweepError::AxisIndexOutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn test_get_point() {
        let params = sample();
        assert_eq!(params.get_point(&[1, 2, 0]).unwrap(), vec![2.0, 30.0, 0.5]);
        assert_eq!(
            params.get_point(&[1, 2]),
            Err(SweepError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        );
        assert!(matches!(
            params.get_point(&[0, 3, 0]),
            Err(SweepError::PointIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_counts_and_ranges() {
        let params = sample();
        assert_eq!(params.counts(), vec![2, 3, 1]);
        assert_eq!(params.ranges(), vec![0..2, 0..3, 0..1]);
        assert_eq!(params.total_points(), 6);
        assert_eq!(params.counts_by_name()["q"], 3);
    }

    #[test]
    fn test_grid_enumeration_order() {
        let params = Parameters::new([("p", vec![1.0, 2.0]), ("q", vec![10.0, 20.0, 30.0])]);
        let points: Vec<Vec<f64>> = params.grid_points().collect();
        assert_eq!(
            points,
            vec![
                vec![1.0, 10.0],
                vec![1.0, 20.0],
                vec![1.0, 30.0],
                vec![2.0, 10.0],
                vec![2.0, 20.0],
                vec![2.0, 30.0],
            ]
        );
    }

    #[test]
    fn test_reorder_by_names_and_indices() {
        let mut params = sample();
        params
            .reorder(AxisOrder::Names(vec![
                "r".to_string(),
                "p".to_string(),
                "q".to_string(),
            ]))
            .unwrap();
        let names: Vec<_> = params.ordered_dict().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["r", "p", "q"]);
        assert_eq!(params.get_by_name("q").unwrap(), &[10.0, 20.0, 30.0]);

        params.reorder(AxisOrder::Indices(vec![2, 0, 1])).unwrap();
        assert_eq!(params.names(), &["q", "r", "p"]);
        assert_eq!(params.counts(), vec![3, 1, 2]);
    }

    #[test]
    fn test_reorder_rejects_non_permutations() {
        let mut params = sample();
        let before = params.clone();
        assert!(matches!(
            params.reorder(AxisOrder::Names(vec!["p".to_string(), "q".to_string()])),
            Err(SweepError::InvalidOrdering(_))
        ));
        assert!(matches!(
            params.reorder(AxisOrder::Names(vec![
                "p".to_string(),
                "p".to_string(),
                "q".to_string()
            ])),
            Err(SweepError::InvalidOrdering(_))
        ));
        assert!(matches!(
            params.reorder(AxisOrder::Indices(vec![0, 0, 1])),
            Err(SweepError::InvalidOrdering(_))
        ));
        assert_eq!(params, before);
    }

    #[test]
    fn test_create_reduced() {
        let params = Parameters::new([("p", vec![1.0, 2.0, 3.0]), ("q", vec![4.0, 5.0])]);

        let reduced = params.create_reduced(&["p"], None).unwrap();
        assert_eq!(reduced.get_by_name("p").unwrap(), &[1.0]);
        assert_eq!(reduced.get_by_name("q").unwrap(), params.get_by_name("q").unwrap());
        assert_eq!(reduced.names(), params.names());

        let fixed = reduced_with_value(&params);
        assert_eq!(fixed.get_by_name("p").unwrap(), &[5.0]);
        assert_eq!(fixed.get_by_name("q").unwrap(), &[4.0, 5.0]);

        assert_eq!(
            params.create_reduced(&["x"], None),
            Err(SweepError::UnknownAxis("x".to_string()))
        );
        assert!(matches!(
            params.create_reduced(&["p", "q"], Some(&[vec![1.0]][..])),
            Err(SweepError::DimensionMismatch { .. })
        ));
    }

    fn reduced_with_value(params: &Parameters) -> Parameters {
        params.create_reduced(&["p"], Some(&[vec![5.0]][..])).unwrap()
    }

    #[test]
    fn test_with_ordering_validates() {
        let mut map = FxHashMap::default();
        map.insert("a".to_string(), vec![1.0]);
        map.insert("b".to_string(), vec![2.0]);
        let params =
            Parameters::with_ordering(map.clone(), vec!["b".to_string(), "a".to_string()])
                .unwrap();
        assert_eq!(params.names(), &["b", "a"]);
        assert!(Parameters::with_ordering(map, vec!["a".to_string()]).is_err());
    }

    #[test]
    fn test_serializes_as_ordered_pairs() {
        let mut params = sample();
        params.reorder(AxisOrder::Indices(vec![1, 0, 2])).unwrap();
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.starts_with("[[\"q\""));
        let back: Parameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
        assert_eq!(back.names(), params.names());
    }
}
