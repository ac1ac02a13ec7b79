//! Output file naming for a training run.
//!
//! Every run writes a fixed set of artifacts into one output directory, each
//! named `{prefix}-{model_id}.{ext}`. Downstream clustering scripts locate the
//! files by these names, so the prefixes and extensions are fixed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::DataError;

/// Kinds of files persisted at the end of training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    /// Full autoencoder weights.
    Weights,
    /// Encoder-only weights, for embedding new frames without the decoder.
    EncoderWeights,
    EncoderHparams,
    DecoderHparams,
    /// Latent embeddings captured at each epoch end.
    Embeddings,
    /// Dataset rows the embeddings were computed for.
    EmbeddingIndices,
    Loss,
    ValLoss,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 8] = [
        ArtifactKind::Weights,
        ArtifactKind::EncoderWeights,
        ArtifactKind::EncoderHparams,
        ArtifactKind::DecoderHparams,
        ArtifactKind::Embeddings,
        ArtifactKind::EmbeddingIndices,
        ArtifactKind::Loss,
        ArtifactKind::ValLoss,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Weights => "ae-weight",
            Self::EncoderWeights => "encoder-weight",
            Self::EncoderHparams => "encoder-hparams",
            Self::DecoderHparams => "decoder-hparams",
            Self::Embeddings => "embed",
            Self::EmbeddingIndices => "embed-idx",
            Self::Loss => "loss",
            Self::ValLoss => "val-loss",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Weights | Self::EncoderWeights => "h5",
            Self::EncoderHparams | Self::DecoderHparams => "pkl",
            Self::Embeddings | Self::EmbeddingIndices | Self::Loss | Self::ValLoss => "npy",
        }
    }

    /// File name for this artifact under the given model id.
    pub fn file_name(self, model_id: &str) -> String {
        format!("{}-{}.{}", self.prefix(), model_id, self.extension())
    }
}

/// Resolved output paths for one training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    model_id: String,
    paths: BTreeMap<ArtifactKind, PathBuf>,
}

impl ArtifactSet {
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn path(&self, kind: ArtifactKind) -> &Path {
        // Every kind is inserted by `ArtifactPathBuilder::build`.
        &self.paths[&kind]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &Path)> {
        self.paths.iter().map(|(k, p)| (*k, p.as_path()))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Artifacts that already exist on disk. Training warns about these
    /// before overwriting them.
    pub fn existing(&self) -> Vec<&Path> {
        self.paths
            .values()
            .filter(|p| p.exists())
            .map(PathBuf::as_path)
            .collect()
    }
}

/// Check that `model_id` is non-empty and limited to `[A-Za-z0-9_-]`.
pub fn validate_model_id(model_id: &str) -> Result<(), DataError> {
    let ok = !model_id.is_empty()
        && model_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(DataError::InvalidModelId(model_id.to_string()))
    }
}

/// Derives an [`ArtifactSet`] from an output directory.
#[derive(Debug, Clone)]
pub struct ArtifactPathBuilder {
    out_dir: PathBuf,
}

impl ArtifactPathBuilder {
    /// `out_dir` is expected to exist already; no I/O happens here.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn build(&self, model_id: &str) -> Result<ArtifactSet, DataError> {
        validate_model_id(model_id)?;
        let paths = ArtifactKind::ALL
            .iter()
            .map(|&kind| (kind, self.out_dir.join(kind.file_name(model_id))))
            .collect();
        Ok(ArtifactSet {
            model_id: model_id.to_string(),
            paths,
        })
    }
}

/// Shorthand for `ArtifactPathBuilder::new(out_dir).build(model_id)`.
pub fn build(out_dir: &Path, model_id: &str) -> Result<ArtifactSet, DataError> {
    ArtifactPathBuilder::new(out_dir).build(model_id)
}
