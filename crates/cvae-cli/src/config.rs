//! TOML config loading for the `cvae` CLI.
//!
//! Deserializes `configs/cvae.toml`, which has optional `[encoder]`, `[decoder]`
//! and `[training]` sections, then merges with CLI overrides.
//!
//! Priority chain: struct defaults < TOML values < CLI flags.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use cvae::{DecoderHyperparams, EncoderHyperparams, VaeTrainingConfig};

/// Rows embedded per epoch by the embedding callback unless overridden.
pub const DEFAULT_EMBED_SAMPLES: usize = 1000;

/// Top-level structure matching `configs/cvae.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CvaeToml {
    #[serde(default)]
    pub encoder: ArchitectureOverrides,
    #[serde(default)]
    pub decoder: ArchitectureOverrides,
    #[serde(default)]
    pub training: TrainingOverrides,
}

/// Optional overrides shared by the encoder and decoder sections.
///
/// Both halves take `latent_dim` from `[training]` or `--latent_dim`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchitectureOverrides {
    pub num_conv_layers: Option<usize>,
    pub filters: Option<Vec<usize>>,
    pub kernels: Option<Vec<usize>>,
    pub strides: Option<Vec<usize>>,
    pub num_affine_layers: Option<usize>,
    pub affine_widths: Option<Vec<usize>>,
    pub affine_dropouts: Option<Vec<f64>>,
}

/// Optional overrides for [`VaeTrainingConfig`] and the embedding callback.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingOverrides {
    pub latent_dim: Option<usize>,
    pub lr: Option<f64>,
    pub rho: Option<f64>,
    pub epsilon: Option<f64>,
    pub batch_size: Option<usize>,
    pub epochs: Option<usize>,
    pub shuffle: Option<bool>,
    pub seed: Option<u64>,
    pub log_interval: Option<usize>,
    pub embed_samples: Option<usize>,
}

/// CLI flags that take part in the priority chain.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub latent_dim: Option<usize>,
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub seed: Option<u64>,
    pub embed_samples: Option<usize>,
}

/// Fully resolved settings for one training run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub encoder: EncoderHyperparams,
    pub decoder: DecoderHyperparams,
    pub training: VaeTrainingConfig,
    pub embed_samples: usize,
}

/// Load and deserialize a `CvaeToml` from a TOML file.
pub fn load_cvae_toml(path: &Path) -> anyhow::Result<CvaeToml> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: CvaeToml = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    tracing::info!(path = %path.display(), "Loaded cvae config");
    Ok(config)
}

impl ArchitectureOverrides {
    pub fn apply_encoder(&self, mut hp: EncoderHyperparams) -> EncoderHyperparams {
        if let Some(n) = self.num_conv_layers {
            hp.num_conv_layers = n;
        }
        if let Some(v) = &self.filters {
            hp.filters = v.clone();
        }
        if let Some(v) = &self.kernels {
            hp.kernels = v.clone();
        }
        if let Some(v) = &self.strides {
            hp.strides = v.clone();
        }
        if let Some(n) = self.num_affine_layers {
            hp.num_affine_layers = n;
        }
        if let Some(v) = &self.affine_widths {
            hp.affine_widths = v.clone();
        }
        if let Some(v) = &self.affine_dropouts {
            hp.affine_dropouts = v.clone();
        }
        hp
    }

    pub fn apply_decoder(&self, mut hp: DecoderHyperparams) -> DecoderHyperparams {
        if let Some(n) = self.num_conv_layers {
            hp.num_conv_layers = n;
        }
        if let Some(v) = &self.filters {
            hp.filters = v.clone();
        }
        if let Some(v) = &self.kernels {
            hp.kernels = v.clone();
        }
        if let Some(v) = &self.strides {
            hp.strides = v.clone();
        }
        if let Some(n) = self.num_affine_layers {
            hp.num_affine_layers = n;
        }
        if let Some(v) = &self.affine_widths {
            hp.affine_widths = v.clone();
        }
        if let Some(v) = &self.affine_dropouts {
            hp.affine_dropouts = v.clone();
        }
        hp
    }
}

/// Resolve run settings from defaults, the TOML file and CLI flags.
///
/// `output_channels` is the channel count of the dataset. When the TOML file
/// does not set decoder filters, the decoder's last filter count is matched
/// to it so multi-channel maps work with the default architecture.
pub fn resolve_settings(
    toml: &CvaeToml,
    cli: &CliOverrides,
    output_channels: usize,
) -> RunSettings {
    let t = &toml.training;
    let latent_dim = cli
        .latent_dim
        .or(t.latent_dim)
        .unwrap_or(EncoderHyperparams::new().latent_dim);

    let encoder = toml
        .encoder
        .apply_encoder(EncoderHyperparams::new())
        .with_latent_dim(latent_dim);

    let mut decoder = toml
        .decoder
        .apply_decoder(DecoderHyperparams::new())
        .with_latent_dim(latent_dim);
    if toml.decoder.filters.is_none() {
        if let Some(last) = decoder.filters.last_mut() {
            *last = output_channels;
        }
    }

    let mut training = VaeTrainingConfig::new();
    if let Some(v) = t.lr {
        training.lr = v;
    }
    if let Some(v) = t.rho {
        training.rho = v;
    }
    if let Some(v) = t.epsilon {
        training.epsilon = v;
    }
    if let Some(v) = cli.batch_size.or(t.batch_size) {
        training.batch_size = v;
    }
    if let Some(v) = cli.epochs.or(t.epochs) {
        training.epochs = v;
    }
    if let Some(v) = t.shuffle {
        training.shuffle = v;
    }
    if let Some(v) = t.log_interval {
        training.log_interval = v;
    }
    training.seed = cli.seed.or(t.seed);

    let embed_samples = cli
        .embed_samples
        .or(t.embed_samples)
        .unwrap_or(DEFAULT_EMBED_SAMPLES);

    RunSettings {
        encoder,
        decoder,
        training,
        embed_samples,
    }
}
