//! VAE objective: summed binary cross-entropy plus Gaussian KL divergence.
//!
//! Both terms are summed per sample and averaged over the batch, so the
//! reconstruction term scales with the number of pixels.

use burn::prelude::*;

use crate::model::vae::VaeOutput;

/// Probabilities are clamped to `[EPS, 1 - EPS]` before taking logs.
const EPS: f64 = 1e-7;

/// Batch-averaged loss terms, each of shape `(1,)`.
#[derive(Debug, Clone)]
pub struct VaeLoss<B: Backend> {
    pub total: Tensor<B, 1>,
    pub reconstruction: Tensor<B, 1>,
    pub kl: Tensor<B, 1>,
}

/// Binary cross-entropy summed over all pixels, averaged over the batch.
///
/// # Arguments
/// - `reconstruction`: shape `(batch, C, H, W)`, values in `[0, 1]`
/// - `target`: same shape as `reconstruction`
pub fn reconstruction_loss<B: Backend>(
    reconstruction: Tensor<B, 4>,
    target: Tensor<B, 4>,
) -> Tensor<B, 1> {
    let p = reconstruction.clamp(EPS, 1.0 - EPS);
    let log_p = p.clone().log();
    let log_not_p = p.neg().add_scalar(1.0).log();
    let bce = (target.clone() * log_p + target.neg().add_scalar(1.0) * log_not_p).neg();

    let per_sample: Tensor<B, 2> = bce.flatten(1, 3).sum_dim(1); // (batch, 1)
    per_sample.mean()
}

/// KL divergence of `N(mean, exp(log_var))` from the standard normal,
/// summed over latent dimensions and averaged over the batch.
pub fn kl_divergence<B: Backend>(z_mean: Tensor<B, 2>, z_log_var: Tensor<B, 2>) -> Tensor<B, 1> {
    let terms = z_log_var.clone().add_scalar(1.0) - z_mean.powf_scalar(2.0) - z_log_var.exp();
    terms.sum_dim(1).mul_scalar(-0.5).mean()
}

/// Full VAE loss for one forward pass against its input batch.
pub fn vae_loss<B: Backend>(output: VaeOutput<B>, target: Tensor<B, 4>) -> VaeLoss<B> {
    let reconstruction = reconstruction_loss(output.reconstruction, target);
    let kl = kl_divergence(output.z_mean, output.z_log_var);
    VaeLoss {
        total: reconstruction.clone() + kl.clone(),
        reconstruction,
        kl,
    }
}
