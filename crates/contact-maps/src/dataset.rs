//! In-memory contact-map dataset.
//!
//! A dataset is a dense `f32` array whose first axis indexes samples (frames
//! of a simulation). Each sample is either a single-channel `H × W` map or a
//! channels-last `H × W × C` stack, matching what the simulation
//! post-processing writes.

use ndarray::{ArrayD, ArrayViewD, Axis};

use crate::error::DataError;

/// Shape of a single contact-map sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl SampleShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Number of scalar values in one sample.
    pub fn num_elements(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl std::fmt::Display for SampleShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// Ordered collection of equally-shaped contact maps.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactMapDataset {
    data: ArrayD<f32>,
}

impl ContactMapDataset {
    /// Wrap a dense array, validating its layout.
    ///
    /// Accepts rank 3 (`N × H × W`) and rank 4 (`N × H × W × C`) arrays with
    /// non-zero spatial and channel extents. `N` may be zero.
    pub fn new(data: ArrayD<f32>) -> Result<Self, DataError> {
        let shape = data.shape();
        if !(3..=4).contains(&shape.len()) {
            return Err(DataError::InvalidDataset(format!(
                "expected a rank 3 (N, H, W) or rank 4 (N, H, W, C) array, got shape {shape:?}"
            )));
        }
        if shape[1..].iter().any(|&d| d == 0) {
            return Err(DataError::InvalidDataset(format!(
                "sample dimensions must be non-zero, got shape {shape:?}"
            )));
        }
        Ok(Self { data })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full array shape including the leading sample axis.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn sample_shape(&self) -> SampleShape {
        let shape = self.data.shape();
        let channels = if shape.len() == 4 { shape[3] } else { 1 };
        SampleShape::new(shape[1], shape[2], channels)
    }

    pub fn view(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }

    pub fn into_inner(self) -> ArrayD<f32> {
        self.data
    }

    /// View of the sample at `index`, or `None` when out of range.
    pub fn sample(&self, index: usize) -> Option<ArrayViewD<'_, f32>> {
        (index < self.len()).then(|| self.data.index_axis(Axis(0), index))
    }

    /// Copy the given rows, in the given order, into a new dataset.
    ///
    /// # Panics
    /// Panics if any index is out of range.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            data: self.data.select(Axis(0), indices),
        }
    }

    /// Flatten the given rows into a row-major `[rows, H, W, C]` buffer.
    ///
    /// # Panics
    /// Panics if any index is out of range.
    pub fn gather(&self, indices: &[usize]) -> Vec<f32> {
        let per_sample = self.sample_shape().num_elements();
        let mut out = Vec::with_capacity(indices.len() * per_sample);
        for &i in indices {
            out.extend(self.data.index_axis(Axis(0), i).iter().copied());
        }
        out
    }

    /// Minimum and maximum value, or `None` for an empty dataset.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        let mut iter = self.data.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    fn ramp(shape: &[usize]) -> ArrayD<f32> {
        let n: usize = shape.iter().product();
        Array::from_shape_vec(IxDyn(shape), (0..n).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn test_rank3_is_single_channel() {
        let ds = ContactMapDataset::new(ramp(&[5, 4, 3])).unwrap();
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.sample_shape(), SampleShape::new(4, 3, 1));
        assert_eq!(ds.sample_shape().num_elements(), 12);
    }

    #[test]
    fn test_rank4_channels_last() {
        let ds = ContactMapDataset::new(ramp(&[2, 6, 6, 2])).unwrap();
        assert_eq!(ds.sample_shape(), SampleShape::new(6, 6, 2));
    }

    #[test]
    fn test_rejects_bad_rank() {
        let err = ContactMapDataset::new(ramp(&[10, 4])).unwrap_err();
        assert!(matches!(err, DataError::InvalidDataset(_)));
        let err = ContactMapDataset::new(ramp(&[1, 2, 2, 1, 1])).unwrap_err();
        assert!(matches!(err, DataError::InvalidDataset(_)));
    }

    #[test]
    fn test_rejects_zero_sized_sample() {
        let err = ContactMapDataset::new(ramp(&[3, 0, 4])).unwrap_err();
        assert!(matches!(err, DataError::InvalidDataset(_)));
    }

    #[test]
    fn test_empty_dataset_allowed() {
        let ds = ContactMapDataset::new(ramp(&[0, 4, 4])).unwrap();
        assert!(ds.is_empty());
        assert!(ds.value_range().is_none());
    }

    #[test]
    fn test_select_and_gather_preserve_order() {
        let ds = ContactMapDataset::new(ramp(&[4, 2, 2])).unwrap();
        let picked = ds.select(&[3, 0]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.sample(0).unwrap()[[0, 0]], 12.0);
        assert_eq!(picked.sample(1).unwrap()[[0, 0]], 0.0);

        let flat = ds.gather(&[1, 2]);
        assert_eq!(flat, vec![4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_sample_out_of_range() {
        let ds = ContactMapDataset::new(ramp(&[2, 2, 2])).unwrap();
        assert!(ds.sample(2).is_none());
    }

    #[test]
    fn test_value_range() {
        let ds = ContactMapDataset::new(ramp(&[2, 2, 2])).unwrap();
        assert_eq!(ds.value_range(), Some((0.0, 7.0)));
    }
}
