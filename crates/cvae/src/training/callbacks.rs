//! Epoch-end hooks invoked by [`train`](crate::train).

use std::path::Path;

use anyhow::Context;
use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use ndarray::{Array1, Array2, Array3, Axis};
use ndarray_npy::write_npy;
use rand::rngs::StdRng;
use rand::SeedableRng;

use contact_maps::ContactMapDataset;

use crate::inference::embed_samples;
use crate::model::vae::Vae;
use crate::training::metrics::EpochSummary;

/// Observer of training progress. Both hooks default to no-ops.
///
/// Callbacks run in registration order. An error aborts training.
pub trait TrainingCallback<B: AutodiffBackend> {
    /// Called after every epoch's validation pass.
    fn on_epoch_end(
        &mut self,
        _summary: &EpochSummary,
        _model: &Vae<B>,
        _device: &B::Device,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once after the final epoch.
    fn on_train_end(
        &mut self,
        _history: &[EpochSummary],
        _model: &Vae<B>,
        _device: &B::Device,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Captures latent embeddings of a random subset of training rows each epoch.
///
/// Rows are drawn without replacement and kept in ascending order. The
/// recorded indices refer to the source dataset the training split was cut
/// from, so downstream tools can map embeddings back to trajectory frames.
pub struct EmbeddingCallback<'a> {
    data: &'a ContactMapDataset,
    source_indices: Vec<usize>,
    sample_size: usize,
    batch_size: usize,
    rng: StdRng,
    embeddings: Vec<Array2<f32>>,
    indices: Vec<Array1<i64>>,
}

impl<'a> EmbeddingCallback<'a> {
    /// `source_indices[i]` is the source row of `data` row `i`.
    pub fn new(
        data: &'a ContactMapDataset,
        source_indices: Vec<usize>,
        sample_size: usize,
        seed: Option<u64>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            source_indices.len() == data.len(),
            "source_indices has {} entries for {} rows",
            source_indices.len(),
            data.len()
        );
        anyhow::ensure!(sample_size > 0, "embedding sample_size must be positive");
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            data,
            source_indices,
            sample_size,
            batch_size: 256,
            rng,
            embeddings: Vec::new(),
            indices: Vec::new(),
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Number of rows embedded per epoch.
    pub fn samples_per_epoch(&self) -> usize {
        self.sample_size.min(self.data.len())
    }

    pub fn epochs_captured(&self) -> usize {
        self.embeddings.len()
    }

    /// Embed a fresh sample of rows with `model` and store the result.
    pub fn capture<B: AutodiffBackend>(
        &mut self,
        model: &Vae<B>,
        device: &B::Device,
    ) -> anyhow::Result<()> {
        let amount = self.samples_per_epoch();
        let mut rows = rand::seq::index::sample(&mut self.rng, self.data.len(), amount).into_vec();
        rows.sort_unstable();

        let eval_model = model.valid();
        let z = embed_samples(&eval_model, self.data, &rows, self.batch_size, device)?;
        let idx: Array1<i64> = rows.iter().map(|&r| self.source_indices[r] as i64).collect();

        self.embeddings.push(z);
        self.indices.push(idx);
        Ok(())
    }

    /// Stacked embeddings, `(epochs, samples, latent_dim)`.
    pub fn stacked_embeddings(&self) -> anyhow::Result<Array3<f32>> {
        anyhow::ensure!(!self.embeddings.is_empty(), "no embeddings captured");
        let views: Vec<_> = self.embeddings.iter().map(|a| a.view()).collect();
        Ok(ndarray::stack(Axis(0), &views)?)
    }

    /// Stacked source indices, `(epochs, samples)`.
    pub fn stacked_indices(&self) -> anyhow::Result<Array2<i64>> {
        anyhow::ensure!(!self.indices.is_empty(), "no embeddings captured");
        let views: Vec<_> = self.indices.iter().map(|a| a.view()).collect();
        Ok(ndarray::stack(Axis(0), &views)?)
    }

    /// Write embeddings (`f32`) and their source indices (`i64`) as `.npy` files.
    pub fn save(&self, embed_path: &Path, index_path: &Path) -> anyhow::Result<()> {
        let embeddings = self.stacked_embeddings()?;
        write_npy(embed_path, &embeddings)
            .with_context(|| format!("Failed to write embeddings to {}", embed_path.display()))?;
        write_npy(index_path, &self.stacked_indices()?).with_context(|| {
            format!("Failed to write embedding indices to {}", index_path.display())
        })?;
        tracing::info!(
            path = %embed_path.display(),
            shape = ?embeddings.shape(),
            "Saved embeddings"
        );
        Ok(())
    }
}

impl<B: AutodiffBackend> TrainingCallback<B> for EmbeddingCallback<'_> {
    fn on_epoch_end(
        &mut self,
        _summary: &EpochSummary,
        model: &Vae<B>,
        device: &B::Device,
    ) -> anyhow::Result<()> {
        self.capture(model, device)
    }
}

/// Per-epoch training and validation loss.
#[derive(Debug, Clone, Default)]
pub struct LossHistory {
    loss: Vec<f64>,
    val_loss: Vec<f64>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loss(&self) -> &[f64] {
        &self.loss
    }

    pub fn val_loss(&self) -> &[f64] {
        &self.val_loss
    }

    pub fn record(&mut self, summary: &EpochSummary) {
        self.loss.push(summary.loss);
        self.val_loss.push(summary.val_loss);
    }

    /// Write both curves as 1-D `f64` `.npy` arrays.
    pub fn save(&self, loss_path: &Path, val_loss_path: &Path) -> anyhow::Result<()> {
        write_npy(loss_path, &Array1::from_vec(self.loss.clone()))
            .with_context(|| format!("Failed to write loss to {}", loss_path.display()))?;
        write_npy(val_loss_path, &Array1::from_vec(self.val_loss.clone()))
            .with_context(|| format!("Failed to write val loss to {}", val_loss_path.display()))?;
        Ok(())
    }
}

impl<B: AutodiffBackend> TrainingCallback<B> for LossHistory {
    fn on_epoch_end(
        &mut self,
        summary: &EpochSummary,
        _model: &Vae<B>,
        _device: &B::Device,
    ) -> anyhow::Result<()> {
        self.record(summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::hparams::{DecoderHyperparams, EncoderHyperparams};
    use burn::backend::{Autodiff, NdArray};
    use contact_maps::SampleShape;
    use ndarray::{Array, IxDyn};
    use ndarray_npy::read_npy;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn model(shape: SampleShape, latent_dim: usize) -> Vae<TestBackend> {
        let device = Default::default();
        let encoder = EncoderHyperparams::new()
            .with_filters(vec![2, 2, 2, 2])
            .with_affine_widths(vec![8])
            .with_latent_dim(latent_dim)
            .init::<TestBackend>(shape, &device)
            .unwrap();
        let (conv, _) = encoder.final_conv_params();
        let decoder = DecoderHyperparams::new()
            .with_filters(vec![2, 2, 2, 1])
            .with_affine_widths(vec![8])
            .with_latent_dim(latent_dim)
            .init::<TestBackend>(shape, conv, &device)
            .unwrap();
        Vae::new(encoder, decoder).unwrap()
    }

    fn summary(epoch: usize, loss: f64) -> EpochSummary {
        EpochSummary {
            epoch,
            loss,
            reconstruction_loss: loss,
            kl_loss: 0.0,
            val_loss: loss + 1.0,
            val_reconstruction_loss: loss + 1.0,
            val_kl_loss: 0.0,
            elapsed_secs: 0.0,
        }
    }

    #[test]
    fn test_embedding_callback_records_source_indices() {
        let device = Default::default();
        let ds = ContactMapDataset::new(Array::zeros(IxDyn(&[6, 4, 4]))).unwrap();
        let source = vec![10, 11, 12, 13, 14, 15];
        let vae = model(ds.sample_shape(), 3);

        let mut cb = EmbeddingCallback::new(&ds, source, 4, Some(7)).unwrap();
        for epoch in 0..2 {
            TrainingCallback::<TestBackend>::on_epoch_end(&mut cb, &summary(epoch, 1.0), &vae, &device)
                .unwrap();
        }

        let emb = cb.stacked_embeddings().unwrap();
        let idx = cb.stacked_indices().unwrap();
        assert_eq!(emb.shape(), &[2, 4, 3]);
        assert_eq!(idx.shape(), &[2, 4]);
        for row in idx.rows() {
            let row = row.to_vec();
            assert!(row.iter().all(|&i| (10..16).contains(&i)));
            assert!(row.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_capture_draws_distinct_rows_each_epoch() {
        let device = Default::default();
        let ds = ContactMapDataset::new(Array::zeros(IxDyn(&[5, 4, 4]))).unwrap();
        let vae = model(ds.sample_shape(), 2);

        let mut cb = EmbeddingCallback::new(&ds, (0..5).collect(), 3, Some(11))
            .unwrap()
            .with_batch_size(2);
        cb.capture(&vae, &device).unwrap();
        cb.capture(&vae, &device).unwrap();

        assert_eq!(cb.epochs_captured(), 2);
        let idx = cb.stacked_indices().unwrap();
        assert_eq!(idx.shape(), &[2, 3]);
        for row in idx.rows() {
            let mut row = row.to_vec();
            row.dedup();
            assert_eq!(row.len(), 3);
        }
    }

    #[test]
    fn test_embedding_sample_capped_by_dataset() {
        let ds = ContactMapDataset::new(Array::zeros(IxDyn(&[3, 4, 4]))).unwrap();
        let cb = EmbeddingCallback::new(&ds, vec![0, 1, 2], 1000, None).unwrap();
        assert_eq!(cb.samples_per_epoch(), 3);
    }

    #[test]
    fn test_embedding_rejects_index_mismatch() {
        let ds = ContactMapDataset::new(Array::zeros(IxDyn(&[3, 4, 4]))).unwrap();
        assert!(EmbeddingCallback::new(&ds, vec![0, 1], 10, None).is_err());
    }

    #[test]
    fn test_embedding_save_without_capture_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let ds = ContactMapDataset::new(Array::zeros(IxDyn(&[3, 4, 4]))).unwrap();
        let cb = EmbeddingCallback::new(&ds, vec![0, 1, 2], 2, None).unwrap();
        assert!(cb
            .save(&tmp.path().join("e.npy"), &tmp.path().join("i.npy"))
            .is_err());
    }

    #[test]
    fn test_loss_history_save() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut history = LossHistory::new();
        history.record(&summary(0, 3.0));
        history.record(&summary(1, 2.0));
        assert_eq!(history.loss(), &[3.0, 2.0]);
        assert_eq!(history.val_loss(), &[4.0, 3.0]);

        let loss_path = tmp.path().join("loss-t.npy");
        let val_path = tmp.path().join("val-loss-t.npy");
        history.save(&loss_path, &val_path).unwrap();

        let loss: Array1<f64> = read_npy(&loss_path).unwrap();
        let val: Array1<f64> = read_npy(&val_path).unwrap();
        assert_eq!(loss.to_vec(), vec![3.0, 2.0]);
        assert_eq!(val.to_vec(), vec![4.0, 3.0]);
    }
}
