use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cvae_cli::config::CliOverrides;
use cvae_cli::pipeline::{self, TrainArgs};

/// cvae: train a convolutional variational autoencoder on MD contact maps.
#[derive(Parser, Debug)]
#[command(name = "cvae", version, about)]
struct Cli {
    /// Contact-map input file (.npy, .npz or .h5).
    #[arg(short = 'i', long = "input", default_value = "cvae_input.h5", value_parser = existing_path)]
    input: PathBuf,
    /// Output directory for model data.
    #[arg(short = 'o', long = "out", value_parser = existing_path)]
    out: PathBuf,
    /// Number of dimensions in latent space [default: 3].
    #[arg(short = 'd', long = "latent_dim", value_parser = positive)]
    latent_dim: Option<usize>,
    /// GPU index (requires the `wgpu` feature).
    #[arg(short = 'g', long = "gpu", default_value_t = 0)]
    gpu: usize,
    /// Model identifier used in every artifact file name.
    #[arg(short = 'm', long = "model_id")]
    model_id: String,
    /// Number of training epochs [default: 100].
    #[arg(short = 'e', long = "epochs", value_parser = positive)]
    epochs: Option<usize>,
    /// Mini-batch size [default: 512].
    #[arg(short = 'b', long = "batch_size", value_parser = positive)]
    batch_size: Option<usize>,
    /// TOML file with encoder, decoder and training overrides.
    #[arg(short = 'c', long = "config", value_parser = existing_path)]
    config: Option<PathBuf>,
    /// Shuffle frames before the 80/20 train/validation split.
    #[arg(long)]
    shuffle: bool,
    /// Seed for the split, weight init, batching and embedding sampling.
    #[arg(long)]
    seed: Option<u64>,
    /// Training rows embedded after every epoch [default: 1000].
    #[arg(long = "embed-samples", value_parser = positive)]
    embed_samples: Option<usize>,
    /// Load data and build the model, but don't train.
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn into_args(self) -> TrainArgs {
        TrainArgs {
            input: self.input,
            out: self.out,
            model_id: self.model_id,
            gpu: self.gpu,
            config: self.config,
            shuffle: self.shuffle,
            overrides: CliOverrides {
                latent_dim: self.latent_dim,
                epochs: self.epochs,
                batch_size: self.batch_size,
                seed: self.seed,
                embed_samples: self.embed_samples,
            },
            dry_run: self.dry_run,
        }
    }
}

/// Accept a path only if it exists, returning it in absolute form.
fn existing_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    let abs = std::path::absolute(&path).unwrap_or(path);
    if abs.exists() {
        Ok(abs)
    } else {
        Err(format!("path does not exist {}", abs.display()))
    }
}

fn positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid integer {value:?}: {e}")),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    pipeline::run_train(cli.into_args())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn dirs() -> (tempfile::TempDir, String, String) {
        let tmp = tempfile::TempDir::new().unwrap();
        let input = tmp.path().join("maps.npy");
        std::fs::write(&input, b"").unwrap();
        let input = input.to_string_lossy().into_owned();
        let out = tmp.path().to_string_lossy().into_owned();
        (tmp, input, out)
    }

    #[test]
    fn test_short_flags() {
        let (_tmp, input, out) = dirs();
        let cli = Cli::try_parse_from([
            "cvae", "-i", &input, "-o", &out, "-d", "5", "-g", "1", "-m", "run1", "-e", "7",
            "-b", "64",
        ])
        .unwrap();
        assert_eq!(cli.latent_dim, Some(5));
        assert_eq!(cli.gpu, 1);
        assert_eq!(cli.model_id, "run1");
        assert_eq!(cli.epochs, Some(7));
        assert_eq!(cli.batch_size, Some(64));
        assert!(!cli.shuffle);
        assert!(cli.input.is_absolute());
    }

    #[test]
    fn test_long_flags_and_defaults() {
        let (_tmp, input, out) = dirs();
        let cli = Cli::try_parse_from([
            "cvae", "--input", &input, "--out", &out, "--model_id", "x", "--shuffle", "--seed",
            "11", "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.gpu, 0);
        assert_eq!(cli.latent_dim, None);
        assert_eq!(cli.seed, Some(11));
        assert!(cli.shuffle);
        assert!(cli.dry_run);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_missing_input_rejected() {
        let (_tmp, _input, out) = dirs();
        let err = Cli::try_parse_from([
            "cvae", "-i", "/definitely/not/here.h5", "-o", &out, "-m", "x",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert!(err.to_string().contains("path does not exist"));
    }

    #[test]
    fn test_missing_out_dir_rejected() {
        let (_tmp, input, _out) = dirs();
        let err = Cli::try_parse_from(["cvae", "-i", &input, "-o", "/no/such/dir", "-m", "x"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_required_flags() {
        let (_tmp, input, out) = dirs();
        let err = Cli::try_parse_from(["cvae", "-i", &input, "-o", &out]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        let err = Cli::try_parse_from(["cvae", "-i", &input, "-m", "x"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_non_positive_values_rejected() {
        let (_tmp, input, out) = dirs();
        for flag in ["--epochs", "--batch_size", "--latent_dim", "--embed-samples"] {
            let err = Cli::try_parse_from(["cvae", "-i", &input, "-o", &out, "-m", "x", flag, "0"])
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueValidation, "{flag}");
        }
        let err = Cli::try_parse_from(["cvae", "-i", &input, "-o", &out, "-m", "x", "-g", "-1"])
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::ValueValidation | ErrorKind::UnknownArgument | ErrorKind::InvalidValue
        ));
    }

    #[test]
    fn test_into_args_carries_overrides() {
        let (_tmp, input, out) = dirs();
        let args = Cli::try_parse_from([
            "cvae", "-i", &input, "-o", &out, "-m", "x", "-e", "3", "--embed-samples", "20",
        ])
        .unwrap()
        .into_args();
        assert_eq!(args.overrides.epochs, Some(3));
        assert_eq!(args.overrides.embed_samples, Some(20));
        assert_eq!(args.overrides.batch_size, None);
        assert_eq!(args.model_id, "x");
    }
}
