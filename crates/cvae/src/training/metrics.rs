//! Per-epoch training summaries with health checks.

/// Mean KL below this suggests the encoder ignores its input.
const COLLAPSE_KL: f64 = 1e-3;
/// Validation loss above this multiple of training loss suggests overfitting.
const OVERFIT_RATIO: f64 = 2.0;

/// Losses for one epoch, averaged over batches.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    /// Zero-based epoch index.
    pub epoch: usize,
    pub loss: f64,
    pub reconstruction_loss: f64,
    pub kl_loss: f64,
    pub val_loss: f64,
    pub val_reconstruction_loss: f64,
    pub val_kl_loss: f64,
    /// Seconds since training started.
    pub elapsed_secs: f64,
}

impl EpochSummary {
    /// Return human-readable warnings about suspicious loss values.
    pub fn health_check(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let all = [
            ("loss", self.loss),
            ("reconstruction_loss", self.reconstruction_loss),
            ("kl_loss", self.kl_loss),
            ("val_loss", self.val_loss),
        ];
        for (name, value) in all {
            if !value.is_finite() {
                warnings.push(format!("{name} is not finite ({value})"));
            }
        }
        if self.kl_loss.is_finite() && self.kl_loss < COLLAPSE_KL {
            warnings.push(format!(
                "KL {:.2e} < {COLLAPSE_KL:.0e}: possible posterior collapse",
                self.kl_loss
            ));
        }
        if self.loss.is_finite()
            && self.val_loss.is_finite()
            && self.loss > 0.0
            && self.val_loss > OVERFIT_RATIO * self.loss
        {
            warnings.push(format!(
                "val_loss {:.4} > {OVERFIT_RATIO}x train loss {:.4}: possible overfitting",
                self.val_loss, self.loss
            ));
        }
        warnings
    }
}

/// Sample-weighted running mean of the three loss terms over an epoch.
#[derive(Debug, Clone, Default)]
pub struct LossAccumulator {
    total: f64,
    reconstruction: f64,
    kl: f64,
    samples: usize,
}

impl LossAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one batch of `batch_size` samples whose losses are batch means.
    pub fn update(&mut self, total: f64, reconstruction: f64, kl: f64, batch_size: usize) {
        let w = batch_size as f64;
        self.total += total * w;
        self.reconstruction += reconstruction * w;
        self.kl += kl * w;
        self.samples += batch_size;
    }

    /// `(total, reconstruction, kl)` means, or NaN if nothing was recorded.
    pub fn mean(&self) -> (f64, f64, f64) {
        if self.samples == 0 {
            return (f64::NAN, f64::NAN, f64::NAN);
        }
        let n = self.samples as f64;
        (self.total / n, self.reconstruction / n, self.kl / n)
    }

    pub fn samples(&self) -> usize {
        self.samples
    }
}
