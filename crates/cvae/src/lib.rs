//! Convolutional variational autoencoder for molecular-dynamics contact maps.
//!
//! The encoder compresses each contact map into a low-dimensional latent
//! Gaussian; the decoder reconstructs contact probabilities from a sample of
//! that Gaussian. Training records per-epoch embeddings and loss curves via
//! callbacks so a downstream clustering step can inspect the latent space.

pub mod inference;
pub mod model;
pub mod training;

pub use inference::embed_samples;
pub use model::hparams::{ConvShape, DecoderHyperparams, EncoderHyperparams, HyperparamError};
pub use model::vae::{Vae, VaeOutput};
pub use training::callbacks::{EmbeddingCallback, LossHistory, TrainingCallback};
pub use training::loss::{vae_loss, VaeLoss};
pub use training::metrics::EpochSummary;
pub use training::trainer::{train, TrainingRun, VaeTrainingConfig};
