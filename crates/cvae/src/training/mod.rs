//! VAE training pipeline: loss, RMSprop training loop, per-epoch metrics and
//! the callbacks that capture embeddings and loss history.

pub mod callbacks;
pub mod loss;
pub mod metrics;
pub mod trainer;
