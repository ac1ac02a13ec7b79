//! Variational autoencoder wrapper tying encoder and decoder together.

use std::path::Path;

use burn::prelude::*;
use burn::tensor::Distribution;

use contact_maps::SampleShape;

use crate::model::decoder::Decoder;
use crate::model::encoder::Encoder;
use crate::model::hparams::HyperparamError;
use crate::model::weights;

/// Result of a VAE forward pass.
#[derive(Debug, Clone)]
pub struct VaeOutput<B: Backend> {
    /// Decoded contact probabilities, `(batch, C, H, W)`.
    pub reconstruction: Tensor<B, 4>,
    /// Latent mean, `(batch, latent_dim)`.
    pub z_mean: Tensor<B, 2>,
    /// Latent log-variance, `(batch, latent_dim)`.
    pub z_log_var: Tensor<B, 2>,
}

/// Convolutional VAE over contact maps.
#[derive(Module, Debug)]
pub struct Vae<B: Backend> {
    encoder: Encoder<B>,
    decoder: Decoder<B>,
}

impl<B: Backend> Vae<B> {
    /// Pair an encoder and decoder, checking that they agree on the sample
    /// shape and latent dimension.
    pub fn new(encoder: Encoder<B>, decoder: Decoder<B>) -> Result<Self, HyperparamError> {
        if encoder.input_shape() != decoder.output_shape() {
            return Err(HyperparamError::ShapeMismatch(format!(
                "encoder consumes {} samples but decoder produces {}",
                encoder.input_shape(),
                decoder.output_shape()
            )));
        }
        if encoder.latent_dim() != decoder.latent_dim() {
            return Err(HyperparamError::ShapeMismatch(format!(
                "encoder latent_dim {} != decoder latent_dim {}",
                encoder.latent_dim(),
                decoder.latent_dim()
            )));
        }
        Ok(Self { encoder, decoder })
    }

    /// Encode, sample `z = mean + exp(log_var / 2) * eps`, decode.
    pub fn forward(&self, x: Tensor<B, 4>) -> VaeOutput<B> {
        let (z_mean, z_log_var) = self.encoder.forward(x);
        let eps = Tensor::random(
            z_mean.shape(),
            Distribution::Normal(0.0, 1.0),
            &z_mean.device(),
        );
        let z = z_mean.clone() + z_log_var.clone().mul_scalar(0.5).exp() * eps;
        VaeOutput {
            reconstruction: self.decoder.forward(z),
            z_mean,
            z_log_var,
        }
    }

    /// Latent embedding (the posterior mean) of a batch.
    pub fn embed(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        self.encoder.forward(x).0
    }

    /// Deterministic reconstruction through the posterior mean.
    pub fn reconstruct(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.decoder.forward(self.embed(x))
    }

    pub fn encoder(&self) -> &Encoder<B> {
        &self.encoder
    }

    pub fn decoder(&self) -> &Decoder<B> {
        &self.decoder
    }

    pub fn input_shape(&self) -> SampleShape {
        self.encoder.input_shape()
    }

    pub fn latent_dim(&self) -> usize {
        self.encoder.latent_dim()
    }

    /// Write full autoencoder weights to `path` (exact path, no extension added).
    pub fn save_weights(&self, path: &Path) -> anyhow::Result<()> {
        weights::save_module(self, path)
    }

    /// Load weights saved by [`Vae::save_weights`] into this (freshly built) model.
    pub fn load_weights(self, path: &Path, device: &B::Device) -> anyhow::Result<Self> {
        weights::load_module(self, path, device)
    }
}
