//! VAE training loop.
//!
//! One epoch is a pass over the (optionally shuffled) training rows in
//! mini-batches with RMSprop, followed by a validation pass through the
//! non-autodiff model. Callbacks observe every epoch in registration order.

use std::time::Instant;

use anyhow::Context;
use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer, RmsPropConfig};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use contact_maps::ContactMapDataset;

use crate::model::bridge::{samples_to_tensor, tensor_to_f64};
use crate::model::vae::Vae;
use crate::training::callbacks::TrainingCallback;
use crate::training::loss::vae_loss;
use crate::training::metrics::{EpochSummary, LossAccumulator};

/// Configuration for VAE training.
#[derive(Config, Debug)]
pub struct VaeTrainingConfig {
    /// RMSprop learning rate.
    #[config(default = 1e-3)]
    pub lr: f64,
    /// RMSprop decay of the squared-gradient average.
    #[config(default = 0.9)]
    pub rho: f64,
    /// RMSprop denominator epsilon.
    #[config(default = 1e-8)]
    pub epsilon: f64,
    #[config(default = 512)]
    pub batch_size: usize,
    #[config(default = 100)]
    pub epochs: usize,
    /// Reshuffle training rows before every epoch.
    #[config(default = true)]
    pub shuffle: bool,
    /// Seeds the backend and batch order. `None` draws from entropy.
    pub seed: Option<u64>,
    /// Epochs between info-level log lines. The last epoch is always logged.
    #[config(default = 1)]
    pub log_interval: usize,
}

/// Trained model plus the per-epoch summaries that produced it.
#[derive(Debug)]
pub struct TrainingRun<B: AutodiffBackend> {
    pub model: Vae<B>,
    pub history: Vec<EpochSummary>,
}

/// Run the VAE training loop.
///
/// # Arguments
/// - `config`: optimiser and schedule settings
/// - `model`: initialised VAE (consumed and returned trained)
/// - `train`, `validation`: datasets whose sample shape matches the model
/// - `callbacks`: invoked after every epoch and once at the end
/// - `device`: burn device for tensor operations
pub fn train<B: AutodiffBackend>(
    config: &VaeTrainingConfig,
    mut model: Vae<B>,
    train: &ContactMapDataset,
    validation: &ContactMapDataset,
    callbacks: &mut [&mut dyn TrainingCallback<B>],
    device: &B::Device,
) -> anyhow::Result<TrainingRun<B>> {
    anyhow::ensure!(config.epochs > 0, "epochs must be positive");
    anyhow::ensure!(config.batch_size > 0, "batch_size must be positive");
    anyhow::ensure!(!train.is_empty(), "training set is empty");
    anyhow::ensure!(!validation.is_empty(), "validation set is empty");
    for (name, ds) in [("training", train), ("validation", validation)] {
        anyhow::ensure!(
            ds.sample_shape() == model.input_shape(),
            "{name} samples are {} but the model expects {}",
            ds.sample_shape(),
            model.input_shape()
        );
    }

    let mut rng = match config.seed {
        Some(seed) => {
            B::seed(seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let mut optimizer = RmsPropConfig::new()
        .with_alpha(config.rho as f32)
        .with_epsilon(config.epsilon as f32)
        .init();

    tracing::info!(
        train = train.len(),
        validation = validation.len(),
        epochs = config.epochs,
        batch_size = config.batch_size,
        lr = config.lr,
        "Starting VAE training"
    );

    let start = Instant::now();
    let mut history = Vec::with_capacity(config.epochs);
    let mut order: Vec<usize> = (0..train.len()).collect();
    let val_order: Vec<usize> = (0..validation.len()).collect();

    for epoch in 0..config.epochs {
        if config.shuffle {
            order.shuffle(&mut rng);
        }

        let mut train_acc = LossAccumulator::new();
        for batch in order.chunks(config.batch_size) {
            let x = samples_to_tensor::<B>(train, batch, device);
            let loss = vae_loss(model.forward(x.clone()), x);

            let total = tensor_to_f64(loss.total.clone());
            let recon = tensor_to_f64(loss.reconstruction);
            let kl = tensor_to_f64(loss.kl);
            train_acc.update(total, recon, kl, batch.len());

            let grads = GradientsParams::from_grads(loss.total.backward(), &model);
            model = optimizer.step(config.lr, model, grads);
        }

        let valid_model = model.valid();
        let mut val_acc = LossAccumulator::new();
        for batch in val_order.chunks(config.batch_size) {
            let x = samples_to_tensor::<B::InnerBackend>(validation, batch, device);
            let loss = vae_loss(valid_model.forward(x.clone()), x);
            val_acc.update(
                tensor_to_f64(loss.total),
                tensor_to_f64(loss.reconstruction),
                tensor_to_f64(loss.kl),
                batch.len(),
            );
        }

        let (loss, reconstruction_loss, kl_loss) = train_acc.mean();
        let (val_loss, val_reconstruction_loss, val_kl_loss) = val_acc.mean();
        let summary = EpochSummary {
            epoch,
            loss,
            reconstruction_loss,
            kl_loss,
            val_loss,
            val_reconstruction_loss,
            val_kl_loss,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };

        let last = epoch + 1 == config.epochs;
        if last || (config.log_interval > 0 && epoch % config.log_interval == 0) {
            tracing::info!(
                epoch = epoch + 1,
                loss = format!("{:.4}", summary.loss),
                recon = format!("{:.4}", summary.reconstruction_loss),
                kl = format!("{:.4}", summary.kl_loss),
                val_loss = format!("{:.4}", summary.val_loss),
                elapsed = format!("{:.1}s", summary.elapsed_secs),
                "Epoch complete"
            );
        }
        let warnings = summary.health_check();
        if !warnings.is_empty() {
            tracing::warn!(epoch = epoch + 1, "Health check warnings: {:?}", warnings);
        }

        for callback in callbacks.iter_mut() {
            callback
                .on_epoch_end(&summary, &model, device)
                .with_context(|| format!("Callback failed at epoch {}", epoch + 1))?;
        }
        history.push(summary);
    }

    for callback in callbacks.iter_mut() {
        callback
            .on_train_end(&history, &model, device)
            .context("Callback failed at end of training")?;
    }

    tracing::info!(
        epochs = history.len(),
        elapsed = format!("{:.1}s", start.elapsed().as_secs_f64()),
        "Training complete"
    );

    Ok(TrainingRun { model, history })
}
