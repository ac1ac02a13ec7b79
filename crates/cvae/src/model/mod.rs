//! VAE model components: hyperparameter records, convolutional encoder and
//! decoder, the VAE wrapper, and the bridge from datasets to burn tensors.

pub mod bridge;
pub mod decoder;
pub mod encoder;
pub mod hparams;
pub mod vae;
pub mod weights;
