//! Integration tests for the `cvae` training pipeline.
//!
//! Runs the full load → split → build → train → save path on a tiny synthetic
//! `.npz` dataset with the NdArray backend.

use std::fs::File;
use std::path::{Path, PathBuf};

use burn::config::Config;
use ndarray::{Array1, Array2, Array3, Array4};
use ndarray_npy::{read_npy, NpzWriter};
use tempfile::TempDir;

use contact_maps::{ArtifactKind, CONTACT_MAPS_KEY};
use cvae::{DecoderHyperparams, EncoderHyperparams};
use cvae_cli::config::CliOverrides;
use cvae_cli::pipeline::{run_train, TrainArgs};

/// Small architecture so the end-to-end run stays fast.
const SMALL_TOML: &str = r#"
[encoder]
filters = [4, 4, 4, 4]
affine_widths = [16]

[decoder]
filters = [4, 4, 4, 1]
affine_widths = [16]
"#;

/// Helper: write `n` 8x8 single-channel maps with a diagonal band to an `.npz`.
fn write_maps(dir: &Path, n: usize) -> PathBuf {
    let path = dir.join("cvae_input.npz");
    let data = Array4::from_shape_fn((n, 8, 8, 1), |(f, i, j, _)| {
        if i.abs_diff(j) <= f % 3 {
            1.0f32
        } else {
            0.0
        }
    });
    let mut npz = NpzWriter::new(File::create(&path).unwrap());
    npz.add_array(CONTACT_MAPS_KEY, &data).unwrap();
    npz.finish().unwrap();
    path
}

fn args(tmp: &TempDir, input: PathBuf, model_id: &str) -> TrainArgs {
    let config = tmp.path().join("cvae.toml");
    std::fs::write(&config, SMALL_TOML).unwrap();
    let out = tmp.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    TrainArgs {
        input,
        out,
        model_id: model_id.to_string(),
        gpu: 0,
        config: Some(config),
        shuffle: true,
        overrides: CliOverrides {
            latent_dim: Some(2),
            epochs: Some(2),
            batch_size: Some(8),
            seed: Some(5),
            embed_samples: Some(6),
        },
        dry_run: false,
    }
}

#[test]
fn test_pipeline_writes_all_artifacts() {
    let tmp = TempDir::new().unwrap();
    let input = write_maps(tmp.path(), 20);
    let artifacts = run_train(args(&tmp, input, "smoke")).unwrap();

    assert_eq!(artifacts.existing().len(), 8);
    let weights = artifacts.path(ArtifactKind::Weights);
    assert_eq!(weights.file_name().unwrap(), "ae-weight-smoke.h5");

    let embed: Array3<f32> = read_npy(artifacts.path(ArtifactKind::Embeddings)).unwrap();
    let idx: Array2<i64> = read_npy(artifacts.path(ArtifactKind::EmbeddingIndices)).unwrap();
    let loss: Array1<f64> = read_npy(artifacts.path(ArtifactKind::Loss)).unwrap();
    let val_loss: Array1<f64> = read_npy(artifacts.path(ArtifactKind::ValLoss)).unwrap();

    // 2 epochs x 6 sampled training rows x latent_dim 2
    assert_eq!(embed.shape(), &[2, 6, 2]);
    assert_eq!(idx.shape(), &[2, 6]);
    assert!(idx.iter().all(|&i| (0..20).contains(&i)));
    assert_eq!(loss.len(), 2);
    assert_eq!(val_loss.len(), 2);
    assert!(loss.iter().chain(val_loss.iter()).all(|v| v.is_finite()));

    let enc = EncoderHyperparams::load(artifacts.path(ArtifactKind::EncoderHparams)).unwrap();
    let dec = DecoderHyperparams::load(artifacts.path(ArtifactKind::DecoderHparams)).unwrap();
    assert_eq!(enc.filters, vec![4, 4, 4, 4]);
    assert_eq!(enc.latent_dim, 2);
    assert_eq!(dec.latent_dim, 2);
}

#[test]
fn test_rerun_overwrites_existing_artifacts() {
    let tmp = TempDir::new().unwrap();
    let input = write_maps(tmp.path(), 20);
    let first = run_train(args(&tmp, input.clone(), "again")).unwrap();
    let loss_path = first.path(ArtifactKind::Loss).to_path_buf();
    std::fs::write(&loss_path, b"stale").unwrap();

    let second = run_train(args(&tmp, input, "again")).unwrap();
    assert_eq!(second.existing().len(), 8);
    let loss: Array1<f64> = read_npy(&loss_path).unwrap();
    assert_eq!(loss.len(), 2);
}

#[test]
fn test_embed_samples_capped_by_training_rows() {
    let tmp = TempDir::new().unwrap();
    let input = write_maps(tmp.path(), 10);
    let mut a = args(&tmp, input, "cap");
    a.overrides.embed_samples = Some(1000);
    a.overrides.epochs = Some(1);
    let artifacts = run_train(a).unwrap();

    let embed: Array3<f32> = read_npy(artifacts.path(ArtifactKind::Embeddings)).unwrap();
    assert_eq!(embed.shape(), &[1, 8, 2]);
}

#[test]
fn test_dry_run_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let input = write_maps(tmp.path(), 10);
    let mut a = args(&tmp, input, "dry");
    a.dry_run = true;
    let artifacts = run_train(a).unwrap();
    assert!(artifacts.existing().is_empty());
}

#[test]
fn test_invalid_model_id_fails_before_loading() {
    let tmp = TempDir::new().unwrap();
    // The input is not even a valid array file; model_id validation must fail first.
    let input = tmp.path().join("garbage.npz");
    std::fs::write(&input, b"not a zip").unwrap();
    let err = run_train(args(&tmp, input, "../escape")).unwrap_err();
    assert!(format!("{err:#}").contains("model"));
}

#[test]
fn test_single_frame_cannot_be_split() {
    let tmp = TempDir::new().unwrap();
    let input = write_maps(tmp.path(), 1);
    let a = args(&tmp, input, "one");
    let out = a.out.clone();
    assert!(run_train(a).is_err());
    assert_eq!(std::fs::read_dir(out).unwrap().count(), 0);
}
