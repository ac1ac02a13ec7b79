//! Batched latent embedding of dataset rows.

use burn::prelude::*;
use ndarray::{Array2, Axis};

use contact_maps::ContactMapDataset;

use crate::model::bridge::{samples_to_tensor, tensor_to_array};
use crate::model::vae::Vae;

/// Embed the given dataset rows with the encoder mean, `batch_size` rows at a time.
///
/// Returns a `(indices.len(), latent_dim)` matrix in the order of `indices`.
pub fn embed_samples<B: Backend>(
    model: &Vae<B>,
    dataset: &ContactMapDataset,
    indices: &[usize],
    batch_size: usize,
    device: &B::Device,
) -> anyhow::Result<Array2<f32>> {
    anyhow::ensure!(batch_size > 0, "batch_size must be positive");
    if let Some(&bad) = indices.iter().find(|&&i| i >= dataset.len()) {
        anyhow::bail!("index {bad} out of range for dataset of {} rows", dataset.len());
    }

    let mut out = Array2::<f32>::zeros((0, model.latent_dim()));
    for chunk in indices.chunks(batch_size) {
        let x = samples_to_tensor::<B>(dataset, chunk, device);
        let z = tensor_to_array(model.embed(x))?;
        out.append(Axis(0), z.view())?;
    }
    Ok(out)
}
