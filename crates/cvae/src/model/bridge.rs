//! Tensor bridge between `ndarray` datasets and burn tensors.
//!
//! Datasets store channels-last rows; burn convolutions expect `(N, C, H, W)`.

use burn::prelude::*;
use burn::tensor::TensorData;
use ndarray::Array2;

use contact_maps::ContactMapDataset;

/// Gather dataset rows into a `(rows, C, H, W)` tensor.
///
/// # Panics
/// Panics if any index is out of range.
pub fn samples_to_tensor<B: Backend>(
    dataset: &ContactMapDataset,
    indices: &[usize],
    device: &B::Device,
) -> Tensor<B, 4> {
    let shape = dataset.sample_shape();
    let flat = dataset.gather(indices);
    Tensor::<B, 4>::from_data(
        TensorData::new(flat, [indices.len(), shape.height, shape.width, shape.channels]),
        device,
    )
    .permute([0, 3, 1, 2])
}

/// Copy a 2D tensor into an `ndarray` matrix.
pub fn tensor_to_array<B: Backend>(tensor: Tensor<B, 2>) -> anyhow::Result<Array2<f32>> {
    let [rows, cols] = tensor.dims();
    let values = tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Failed to read tensor data: {e:?}"))?;
    Ok(Array2::from_shape_vec((rows, cols), values)?)
}

/// Extract a single f64 scalar from a one-element tensor.
pub fn tensor_to_f64<B: Backend>(tensor: Tensor<B, 1>) -> f64 {
    tensor.into_scalar().elem()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use ndarray::{Array, IxDyn};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_channels_last_becomes_channels_first() {
        let device = Default::default();
        // 2 samples of 2x2 with 2 channels; value encodes (sample, row, col, channel).
        let data = Array::from_shape_fn(IxDyn(&[2, 2, 2, 2]), |idx| {
            (idx[0] * 1000 + idx[1] * 100 + idx[2] * 10 + idx[3]) as f32
        });
        let ds = ContactMapDataset::new(data).unwrap();

        let t = samples_to_tensor::<TestBackend>(&ds, &[1], &device);
        assert_eq!(t.dims(), [1, 2, 2, 2]);
        // Channel 1, row 0, col 1 of sample 1.
        let v: f32 = t.slice([0..1, 1..2, 0..1, 1..2]).into_scalar().elem();
        assert_eq!(v, 1011.0);
    }

    #[test]
    fn test_single_channel_adds_axis() {
        let device = Default::default();
        let ds = ContactMapDataset::new(Array::zeros(IxDyn(&[4, 3, 5]))).unwrap();
        let t = samples_to_tensor::<TestBackend>(&ds, &[0, 2, 3], &device);
        assert_eq!(t.dims(), [3, 1, 3, 5]);
    }

    #[test]
    fn test_tensor_to_array() {
        let device = Default::default();
        let t = Tensor::<TestBackend, 2>::from_data(
            TensorData::from([[1.0_f32, 2.0], [3.0, 4.0], [5.0, 6.0]]),
            &device,
        );
        let arr = tensor_to_array(t).unwrap();
        assert_eq!(arr.dim(), (3, 2));
        assert_eq!(arr[[2, 1]], 6.0);
    }
}
