use burn::nn::conv::ConvTranspose2d;
use burn::nn::{Dropout, Linear};
use burn::prelude::*;
use burn::tensor::activation::{relu, sigmoid};

use contact_maps::SampleShape;

/// Transposed-convolution decoder mapping latent vectors to contact probabilities.
///
/// Built by [`DecoderHyperparams::init`](crate::DecoderHyperparams::init).
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub(crate) affine: Vec<Linear<B>>,
    pub(crate) dropouts: Vec<Dropout>,
    pub(crate) project: Linear<B>,
    pub(crate) deconvs: Vec<ConvTranspose2d<B>>,
    pub(crate) conv_channels: usize,
    pub(crate) conv_height: usize,
    pub(crate) conv_width: usize,
    pub(crate) output_channels: usize,
    pub(crate) output_height: usize,
    pub(crate) output_width: usize,
    pub(crate) latent_dim: usize,
}

impl<B: Backend> Decoder<B> {
    /// Decode latents into per-pixel contact probabilities.
    ///
    /// Input shape: `(batch, latent_dim)`
    /// Output shape: `(batch, C, H, W)`, values in `(0, 1)`
    pub fn forward(&self, z: Tensor<B, 2>) -> Tensor<B, 4> {
        let mut h = z;
        for (linear, dropout) in self.affine.iter().zip(&self.dropouts) {
            h = dropout.forward(relu(linear.forward(h)));
        }
        let h = relu(self.project.forward(h));
        let [batch, _] = h.dims();

        let mut x: Tensor<B, 4> =
            h.reshape([batch, self.conv_channels, self.conv_height, self.conv_width]);
        let last = self.deconvs.len() - 1;
        for (i, deconv) in self.deconvs.iter().enumerate() {
            x = deconv.forward(x);
            x = if i == last { sigmoid(x) } else { relu(x) };
        }
        x
    }

    pub fn output_shape(&self) -> SampleShape {
        SampleShape::new(self.output_height, self.output_width, self.output_channels)
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::hparams::{DecoderHyperparams, EncoderHyperparams};
    use burn::backend::ndarray::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    fn round_trip_shape(shape: SampleShape) -> [usize; 4] {
        let device = Default::default();
        let enc_hp = EncoderHyperparams::new().with_filters(vec![4, 4, 4, 4]);
        let enc_conv = enc_hp.final_conv_shape(shape);
        let decoder = DecoderHyperparams::new()
            .with_filters(vec![4, 4, 4, shape.channels])
            .init::<TestBackend>(shape, enc_conv, &device)
            .unwrap();
        let z = Tensor::<TestBackend, 2>::random([3, 3], Distribution::Normal(0.0, 1.0), &device);
        decoder.forward(z).dims()
    }

    #[test]
    fn test_reproduces_even_and_odd_extents() {
        assert_eq!(round_trip_shape(SampleShape::new(22, 22, 1)), [3, 1, 22, 22]);
        assert_eq!(round_trip_shape(SampleShape::new(21, 21, 1)), [3, 1, 21, 21]);
        assert_eq!(round_trip_shape(SampleShape::new(16, 13, 2)), [3, 2, 16, 13]);
    }

    #[test]
    fn test_output_is_probability() {
        let device = Default::default();
        let shape = SampleShape::new(8, 8, 1);
        let decoder = DecoderHyperparams::new()
            .with_filters(vec![4, 4, 4, 1])
            .init::<TestBackend>(shape, EncoderHyperparams::new().final_conv_shape(shape), &device)
            .unwrap();
        let z = Tensor::<TestBackend, 2>::random([4, 3], Distribution::Normal(0.0, 3.0), &device);
        let values: Vec<f32> = decoder.forward(z).into_data().to_vec().unwrap();
        assert!(values.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(decoder.output_shape(), shape);
    }
}
