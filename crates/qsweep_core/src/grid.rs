//! Labeled N-dimensional arrays.
//!
//! `NamedArray<T>` keeps its values in one flat row-major buffer (the last
//! dimension varies fastest) and attaches a name and a list of value labels
//! to every dimension. Sweep results are stored in this form, so a dimension
//! can be addressed either by position or by the parameter it belongs to.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// One named dimension of a [`NamedArray`] with a label per position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub labels: Vec<f64>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, labels: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            labels,
        }
    }

    /// Dimension labelled by its own positions `0, 1, ..., count - 1`
    pub fn indexed(name: impl Into<String>, count: usize) -> Self {
        Self::new(name, (0..count).map(|i| i as f64).collect())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Selection applied to a single dimension when slicing a [`NamedArray`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Keep the whole dimension
    All,
    /// Fix the dimension at one position; the dimension is dropped from the result
    Index(usize),
    /// Keep a contiguous sub-range of positions
    Range(Range<usize>),
}

impl Selector {
    /// Whether the dimension survives the selection
    pub fn is_free(&self) -> bool {
        !matches!(self, Selector::Index(_))
    }
}

/// N-dimensional labeled array with flat backing storage and stride-based indexing.
///
/// Deserialization rebuilds shape and strides from the dimensions and rejects
/// data whose length does not match them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNamedArray<T>")]
pub struct NamedArray<T> {
    /// Values in row-major order
    data: Vec<T>,
    /// Named, labelled dimensions in storage order
    dims: Vec<Dimension>,
    /// Length of each dimension
    shape: Vec<usize>,
    /// Precomputed strides for index calculation
    strides: Vec<usize>,
}

/// Persisted form of a [`NamedArray`]; stored shape and strides are ignored
#[derive(Deserialize)]
struct RawNamedArray<T> {
    data: Vec<T>,
    dims: Vec<Dimension>,
}

impl<T> TryFrom<RawNamedArray<T>> for NamedArray<T> {
    type Error = SweepError;

    fn try_from(raw: RawNamedArray<T>) -> Result<Self> {
        Self::try_from_data(raw.dims, raw.data)
    }
}

impl<T> NamedArray<T> {
    /// Build an array from row-major data. Returns `None` if the data length
    /// does not match the product of the dimension lengths.
    pub fn from_data(dims: Vec<Dimension>, data: Vec<T>) -> Option<Self> {
        let shape: Vec<usize> = dims.iter().map(Dimension::len).collect();
        let total_size: usize = shape.iter().product();
        if data.len() != total_size {
            return None;
        }
        let strides = compute_strides(&shape);
        Some(Self {
            data,
            dims,
            shape,
            strides,
        })
    }

    /// Like [`NamedArray::from_data`], reporting a length mismatch as an error
    pub fn try_from_data(dims: Vec<Dimension>, data: Vec<T>) -> Result<Self> {
        let expected: usize = dims.iter().map(Dimension::len).product();
        let found = data.len();
        Self::from_data(dims, data).ok_or(SweepError::ShapeMismatch { expected, found })
    }

    /// Build an array by evaluating `f` at every index tuple in row-major order
    pub fn from_fn(dims: Vec<Dimension>, mut f: impl FnMut(&[usize]) -> T) -> Self {
        let shape: Vec<usize> = dims.iter().map(Dimension::len).collect();
        let data = GridIndices::new(shape.clone())
            .map(|indices| f(&indices))
            .collect();
        let strides = compute_strides(&shape);
        Self {
            data,
            dims,
            shape,
            strides,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn dim_names(&self) -> Vec<&str> {
        self.dims.iter().map(|d| d.name.as_str()).collect()
    }

    /// Position of the dimension with the given name
    pub fn dim_index(&self, name: &str) -> Option<usize> {
        self.dims.iter().position(|d| d.name == name)
    }

    /// Labels of the dimension with the given name
    pub fn labels(&self, name: &str) -> Option<&[f64]> {
        self.dims
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.labels.as_slice())
    }

    /// Convert multi-dimensional indices to flat index
    pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (i, (&idx, &size)) in indices.iter().zip(&self.shape).enumerate() {
            if idx >= size {
                return None;
            }
            flat += idx * self.strides[i];
        }
        Some(flat)
    }

    /// Convert flat index to multi-dimensional indices
    pub fn multi_index(&self, flat: usize) -> Option<Vec<usize>> {
        if flat >= self.data.len() {
            return None;
        }
        let mut indices = Vec::with_capacity(self.shape.len());
        let mut remaining = flat;
        for &stride in &self.strides {
            indices.push(remaining / stride);
            remaining %= stride;
        }
        Some(indices)
    }

    pub fn get(&self, indices: &[usize]) -> Option<&T> {
        self.flat_index(indices).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, indices: &[usize]) -> Option<&mut T> {
        self.flat_index(indices).map(|i| &mut self.data[i])
    }

    /// Set the value at the given indices. Returns false if out of range.
    pub fn set(&mut self, indices: &[usize], value: T) -> bool {
        if let Some(i) = self.flat_index(indices) {
            self.data[i] = value;
            true
        } else {
            false
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Iterate over all indices in row-major order
    pub fn indices(&self) -> GridIndices {
        GridIndices::new(self.shape.clone())
    }

    /// Iterate over (indices, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (Vec<usize>, &T)> {
        self.indices().zip(self.data.iter())
    }

    /// Apply `f` to every element, keeping dimensions and labels
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> NamedArray<U> {
        NamedArray {
            data: self.data.iter().map(f).collect(),
            dims: self.dims.clone(),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
        }
    }
}

impl<T: Clone> NamedArray<T> {
    /// Create an array with every element set to `value`
    pub fn filled(dims: Vec<Dimension>, value: T) -> Self {
        Self::from_fn(dims, |_| value.clone())
    }

    /// Slice the array with one selector per dimension.
    ///
    /// Missing trailing selectors select the whole dimension. Dimensions fixed by
    /// [`Selector::Index`] are dropped from the result; labels of the surviving
    /// dimensions are carried along.
    pub fn select(&self, selectors: &[Selector]) -> Result<NamedArray<T>> {
        if selectors.len() > self.ndim() {
            return Err(SweepError::DimensionMismatch {
                expected: self.ndim(),
                found: selectors.len(),
            });
        }

        // Positions kept along each source dimension
        let mut kept: Vec<Vec<usize>> = Vec::with_capacity(self.ndim());
        let mut dims = Vec::new();
        for (axis, dim) in self.dims.iter().enumerate() {
            let selector = selectors.get(axis).unwrap_or(&Selector::All);
            match selector {
                Selector::All => {
                    kept.push((0..dim.len()).collect());
                    dims.push(dim.clone());
                }
                Selector::Index(index) => {
                    if *index >= dim.len() {
                        return Err(SweepError::PointIndexOutOfRange {
                            axis: dim.name.clone(),
                            index: *index,
                            count: dim.len(),
                        });
                    }
                    kept.push(vec![*index]);
                }
                Selector::Range(range) => {
                    if range.start > range.end || range.end > dim.len() {
                        return Err(SweepError::PointIndexOutOfRange {
                            axis: dim.name.clone(),
                            index: range.end,
                            count: dim.len(),
                        });
                    }
                    kept.push(range.clone().collect());
                    dims.push(Dimension::new(
                        dim.name.clone(),
                        dim.labels[range.clone()].to_vec(),
                    ));
                }
            }
        }

        let sub_shape: Vec<usize> = kept.iter().map(Vec::len).collect();
        let data = GridIndices::new(sub_shape)
            .map(|sub| {
                let flat: usize = sub
                    .iter()
                    .enumerate()
                    .map(|(axis, &i)| kept[axis][i] * self.strides[axis])
                    .sum();
                self.data[flat].clone()
            })
            .collect();

        NamedArray::try_from_data(dims, data)
    }

    /// Slice by dimension name, fixing each named dimension at the given position
    pub fn select_by_name(&self, fixed: &[(&str, usize)]) -> Result<NamedArray<T>> {
        let mut selectors = vec![Selector::All; self.ndim()];
        for (name, index) in fixed {
            let axis = self
                .dim_index(name)
                .ok_or_else(|| SweepError::UnknownAxis((*name).to_string()))?;
            selectors[axis] = Selector::Index(*index);
        }
        self.select(&selectors)
    }

    /// Repeat every element `count` times along `axis`.
    ///
    /// Applied to a single-position dimension this broadcasts the stored values
    /// across the full dimension by exact duplication. `labels` replaces the
    /// dimension's labels and must match the new length.
    pub fn repeat_axis(&self, axis: usize, count: usize, labels: Vec<f64>) -> Result<NamedArray<T>> {
        if axis >= self.ndim() {
            return Err(SweepError::AxisIndexOutOfRange {
                index: axis,
                count: self.ndim(),
            });
        }
        let new_len = self.shape[axis] * count;
        if labels.len() != new_len {
            return Err(SweepError::ShapeMismatch {
                expected: new_len,
                found: labels.len(),
            });
        }

        let mut dims = self.dims.clone();
        dims[axis].labels = labels;
        let mut source = vec![0; self.ndim()];
        Ok(NamedArray::from_fn(dims, |indices| {
            source.copy_from_slice(indices);
            source[axis] = indices[axis] / count;
            self.data[self.flat_index_unchecked(&source)].clone()
        }))
    }

    /// Stack equally shaped arrays along a new leading dimension.
    ///
    /// `dim` labels the new dimension and must have one position per array.
    pub fn stack(arrays: Vec<NamedArray<T>>, dim: Dimension) -> Result<NamedArray<T>> {
        if dim.len() != arrays.len() {
            return Err(SweepError::ShapeMismatch {
                expected: dim.len(),
                found: arrays.len(),
            });
        }
        let Some(first) = arrays.first() else {
            return NamedArray::try_from_data(vec![dim], Vec::new());
        };
        let inner_dims = first.dims.clone();
        let inner_len = first.len();

        let mut data = Vec::with_capacity(inner_len * arrays.len());
        for array in arrays {
            if array.dims.len() != inner_dims.len()
                || array.shape.iter().zip(&inner_dims).any(|(s, d)| *s != d.len())
            {
                return Err(SweepError::ShapeMismatch {
                    expected: inner_len,
                    found: array.len(),
                });
            }
            data.extend(array.data);
        }

        let mut dims = Vec::with_capacity(inner_dims.len() + 1);
        dims.push(dim);
        dims.extend(inner_dims);
        NamedArray::try_from_data(dims, data)
    }

    fn flat_index_unchecked(&self, indices: &[usize]) -> usize {
        indices
            .iter()
            .zip(&self.strides)
            .map(|(&idx, &stride)| idx * stride)
            .sum()
    }
}

/// Compute strides for row-major order
pub(crate) fn compute_strides(shape: &[usize]) -> Vec<usize> {
    if shape.is_empty() {
        return Vec::new();
    }
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len() - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Iterator over all index tuples of a grid in row-major order
#[derive(Debug, Clone)]
pub struct GridIndices {
    shape: Vec<usize>,
    current: Vec<usize>,
    done: bool,
}

impl GridIndices {
    pub fn new(shape: Vec<usize>) -> Self {
        let done = shape.contains(&0);
        Self {
            current: vec![0; shape.len()],
            shape,
            done,
        }
    }
}

impl Iterator for GridIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current.clone();

        // A zero-dimensional grid holds exactly one point
        if self.shape.is_empty() {
            self.done = true;
        }

        // Increment indices (row-major: last dimension varies fastest)
        for i in (0..self.shape.len()).rev() {
            self.current[i] += 1;
            if self.current[i] < self.shape[i] {
                break;
            }
            self.current[i] = 0;
            if i == 0 {
                self.done = true;
            }
        }

        Some(result)
    }
}
