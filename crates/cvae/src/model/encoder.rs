use std::path::Path;

use burn::nn::conv::Conv2d;
use burn::nn::{Dropout, Linear};
use burn::prelude::*;
use burn::tensor::activation::relu;

use contact_maps::SampleShape;

use crate::model::hparams::ConvShape;
use crate::model::weights;

/// Convolutional encoder mapping contact maps to a diagonal Gaussian in latent space.
///
/// Built by [`EncoderHyperparams::init`](crate::EncoderHyperparams::init).
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub(crate) convs: Vec<Conv2d<B>>,
    pub(crate) affine: Vec<Linear<B>>,
    pub(crate) dropouts: Vec<Dropout>,
    pub(crate) z_mean: Linear<B>,
    pub(crate) z_log_var: Linear<B>,
    pub(crate) input_channels: usize,
    pub(crate) input_height: usize,
    pub(crate) input_width: usize,
    pub(crate) conv_channels: usize,
    pub(crate) conv_height: usize,
    pub(crate) conv_width: usize,
    pub(crate) latent_dim: usize,
}

impl<B: Backend> Encoder<B> {
    /// Encode a batch into latent mean and log-variance.
    ///
    /// Input shape: `(batch, C, H, W)`
    /// Output shapes: `(batch, latent_dim)`, `(batch, latent_dim)`
    pub fn forward(&self, x: Tensor<B, 4>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let mut x = x;
        for conv in &self.convs {
            x = relu(conv.forward(x));
        }

        let mut h: Tensor<B, 2> = x.flatten(1, 3);
        for (linear, dropout) in self.affine.iter().zip(&self.dropouts) {
            h = dropout.forward(relu(linear.forward(h)));
        }

        (self.z_mean.forward(h.clone()), self.z_log_var.forward(h))
    }

    /// Shape and element count of the last conv activation.
    ///
    /// The decoder projects latents to exactly this many activations and
    /// reshapes them to this shape before upsampling.
    pub fn final_conv_params(&self) -> (ConvShape, usize) {
        let shape = ConvShape::new(self.conv_channels, self.conv_height, self.conv_width);
        (shape, shape.params())
    }

    pub fn input_shape(&self) -> SampleShape {
        SampleShape::new(self.input_height, self.input_width, self.input_channels)
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    /// Write encoder-only weights to `path` (exact path, no extension added).
    pub fn save_weights(&self, path: &Path) -> anyhow::Result<()> {
        weights::save_module(self, path)
    }
}
