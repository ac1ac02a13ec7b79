//! Training pipeline for the `cvae` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use burn::config::Config;
use burn::prelude::Backend;
use burn::tensor::backend::AutodiffBackend;
use indicatif::{ProgressBar, ProgressStyle};

use contact_maps::{
    load_contact_maps, ArtifactKind, ArtifactPathBuilder, ArtifactSet, DatasetPartitioner,
};
use cvae::{train, EmbeddingCallback, EpochSummary, LossHistory, TrainingCallback, Vae};

use crate::config::{load_cvae_toml, resolve_settings, CliOverrides, CvaeToml};
use crate::device::{DeviceContext, TrainBackend};

/// Arguments for a training run.
#[derive(Debug, Clone)]
pub struct TrainArgs {
    /// Contact-map file (`.npy`, `.npz`, `.h5`).
    pub input: PathBuf,
    /// Existing directory that receives the artifacts.
    pub out: PathBuf,
    /// Identifier embedded in every artifact file name.
    pub model_id: String,
    /// GPU index for the `wgpu` backend.
    pub gpu: usize,
    /// Optional TOML hyperparameter overrides.
    pub config: Option<PathBuf>,
    /// Shuffle frames before the 80/20 split.
    pub shuffle: bool,
    /// Flag overrides that take priority over the TOML file.
    pub overrides: CliOverrides,
    /// Build the model and stop before training.
    pub dry_run: bool,
}

/// Drives an `indicatif` progress bar from epoch-end events.
pub struct ProgressCallback {
    pb: ProgressBar,
}

impl ProgressCallback {
    pub fn new(epochs: usize) -> Self {
        let pb = ProgressBar::new(epochs as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} epochs ({eta}) {msg}")
                .expect("valid progress bar template")
                .progress_chars("=> "),
        );
        Self { pb }
    }
}

impl<B: AutodiffBackend> TrainingCallback<B> for ProgressCallback {
    fn on_epoch_end(
        &mut self,
        summary: &EpochSummary,
        _model: &Vae<B>,
        _device: &B::Device,
    ) -> anyhow::Result<()> {
        self.pb.set_message(format!(
            "loss={:.3} val_loss={:.3}",
            summary.loss, summary.val_loss
        ));
        self.pb.inc(1);
        Ok(())
    }

    fn on_train_end(
        &mut self,
        _history: &[EpochSummary],
        _model: &Vae<B>,
        _device: &B::Device,
    ) -> anyhow::Result<()> {
        self.pb.finish_with_message("done");
        Ok(())
    }
}

/// Train a VAE on the input contact maps and write every artifact.
///
/// Returns the artifact paths. With `dry_run` the paths are returned without
/// anything being written.
pub fn run_train(args: TrainArgs) -> anyhow::Result<ArtifactSet> {
    let start = Instant::now();

    // 1. Artifact paths (validates model_id before any heavy work)
    let artifacts = ArtifactPathBuilder::new(&args.out).build(&args.model_id)?;
    let existing = artifacts.existing();
    if !existing.is_empty() {
        tracing::warn!(
            count = existing.len(),
            files = ?existing,
            "Artifacts for this model id already exist and will be overwritten"
        );
    }

    // 2. Config
    let toml = match &args.config {
        Some(path) => load_cvae_toml(path)?,
        None => CvaeToml::default(),
    };

    // 3. Load and partition data
    let data = load_contact_maps(&args.input)
        .with_context(|| format!("Failed to load contact maps from {}", args.input.display()))?;
    let sample_shape = data.sample_shape();
    let split = DatasetPartitioner::new()
        .with_shuffle(args.shuffle)
        .with_seed(args.overrides.seed)
        .partition(&data)?;
    drop(data);

    // 4. Build models
    let settings = resolve_settings(&toml, &args.overrides, sample_shape.channels);
    let ctx = DeviceContext::new(args.gpu);
    let device = ctx.device();
    if let Some(seed) = settings.training.seed {
        TrainBackend::seed(seed);
    }

    let encoder = settings.encoder.init::<TrainBackend>(sample_shape, device)?;
    let (enc_conv, enc_params) = encoder.final_conv_params();
    let decoder = settings
        .decoder
        .init::<TrainBackend>(sample_shape, enc_conv, device)?;
    let model = Vae::new(encoder, decoder)?;
    tracing::info!(
        device = %ctx.describe(),
        input = %sample_shape,
        final_conv = %enc_conv,
        final_conv_params = enc_params,
        latent_dim = model.latent_dim(),
        "Built VAE"
    );

    if args.dry_run {
        tracing::info!(
            train = split.train.len(),
            validation = split.validation.len(),
            "Dry run complete, model built successfully"
        );
        return Ok(artifacts);
    }

    // 5. Train
    let mut embeddings = EmbeddingCallback::new(
        &split.train,
        split.train_indices.clone(),
        settings.embed_samples,
        settings.training.seed,
    )?
    .with_batch_size(settings.training.batch_size);
    let mut losses = LossHistory::new();
    let mut progress = ProgressCallback::new(settings.training.epochs);

    let run = {
        let mut callbacks: [&mut dyn TrainingCallback<TrainBackend>; 3] =
            [&mut embeddings, &mut losses, &mut progress];
        train(
            &settings.training,
            model,
            &split.train,
            &split.validation,
            &mut callbacks,
            device,
        )?
    };

    // 6. Save artifacts
    run.model.save_weights(artifacts.path(ArtifactKind::Weights))?;
    run.model
        .encoder()
        .save_weights(artifacts.path(ArtifactKind::EncoderWeights))?;
    save_config(&settings.encoder, &artifacts, ArtifactKind::EncoderHparams)?;
    save_config(&settings.decoder, &artifacts, ArtifactKind::DecoderHparams)?;
    embeddings.save(
        artifacts.path(ArtifactKind::Embeddings),
        artifacts.path(ArtifactKind::EmbeddingIndices),
    )?;
    losses.save(
        artifacts.path(ArtifactKind::Loss),
        artifacts.path(ArtifactKind::ValLoss),
    )?;

    let final_loss = run.history.last().map(|s| s.loss).unwrap_or(f64::NAN);
    let final_val_loss = run.history.last().map(|s| s.val_loss).unwrap_or(f64::NAN);
    tracing::info!(
        model_id = artifacts.model_id(),
        out = %args.out.display(),
        epochs = run.history.len(),
        final_loss = format!("{final_loss:.4}"),
        final_val_loss = format!("{final_val_loss:.4}"),
        elapsed = format!("{:.1}s", start.elapsed().as_secs_f64()),
        "Saved all artifacts"
    );

    Ok(artifacts)
}

fn save_config<C: Config>(
    config: &C,
    artifacts: &ArtifactSet,
    kind: ArtifactKind,
) -> anyhow::Result<()> {
    let path = artifacts.path(kind);
    config
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
