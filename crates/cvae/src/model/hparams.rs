//! Hyperparameter records for the convolutional encoder and decoder.
//!
//! Both records are burn `Config`s: immutable once built, serialisable to
//! JSON, and the only source of architecture decisions. `init` validates the
//! record against the sample shape before any layer is allocated.
//!
//! Geometry: every convolution uses "same" padding `(k - 1) / 2`, so a layer
//! with stride `s` maps a spatial extent `n` to `ceil(n / s)`. The decoder
//! inverts that mapping with transposed convolutions whose output padding is
//! chosen per layer to land exactly on the original extent.

use burn::nn::conv::{Conv2dConfig, ConvTranspose2dConfig};
use burn::nn::{DropoutConfig, LinearConfig, PaddingConfig2d};
use burn::prelude::*;

use contact_maps::SampleShape;

use crate::model::decoder::Decoder;
use crate::model::encoder::Encoder;

/// Errors from validating hyperparameters against each other or a sample shape.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HyperparamError {
    /// A per-layer list does not have one entry per layer.
    #[error("{field} has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{0} must be positive")]
    NonPositive(&'static str),

    /// Same padding is only symmetric for odd kernels.
    #[error("kernel size {kernel} at layer {layer} must be odd")]
    EvenKernel { layer: usize, kernel: usize },

    #[error("dropout {value} at layer {layer} must lie in [0, 1)")]
    InvalidDropout { layer: usize, value: f64 },

    /// Encoder and decoder disagree about a shape.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Transposed convolution cannot reach the requested extent.
    #[error("layer {layer} needs output padding {padding}, which must be below stride {stride}")]
    OutputPadding {
        layer: usize,
        padding: isize,
        stride: usize,
    },

    /// Final decoder filter count differs from the sample channel count.
    #[error("decoder produces {actual} channels but samples have {expected}")]
    ChannelMismatch { expected: usize, actual: usize },
}

/// Shape of a convolutional activation, channels first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConvShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ConvShape {
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// Number of activations, i.e. the flattened width fed to the affine layers.
    pub fn params(&self) -> usize {
        self.channels * self.height * self.width
    }
}

impl std::fmt::Display for ConvShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.channels, self.height, self.width)
    }
}

/// Spatial extent after a same-padded convolution with the given stride.
pub fn same_conv_output(size: usize, stride: usize) -> usize {
    size.div_ceil(stride)
}

fn same_padding(kernel: usize) -> usize {
    (kernel - 1) / 2
}

fn check_len(field: &'static str, actual: usize, expected: usize) -> Result<(), HyperparamError> {
    if actual == expected {
        Ok(())
    } else {
        Err(HyperparamError::LengthMismatch {
            field,
            expected,
            actual,
        })
    }
}

fn check_positive(field: &'static str, values: &[usize]) -> Result<(), HyperparamError> {
    if values.iter().all(|&v| v > 0) {
        Ok(())
    } else {
        Err(HyperparamError::NonPositive(field))
    }
}

/// Validation shared by both halves of the autoencoder.
#[allow(clippy::too_many_arguments)]
fn validate_stack(
    num_conv_layers: usize,
    filters: &[usize],
    kernels: &[usize],
    strides: &[usize],
    num_affine_layers: usize,
    affine_widths: &[usize],
    affine_dropouts: &[f64],
    latent_dim: usize,
) -> Result<(), HyperparamError> {
    if num_conv_layers == 0 {
        return Err(HyperparamError::NonPositive("num_conv_layers"));
    }
    if latent_dim == 0 {
        return Err(HyperparamError::NonPositive("latent_dim"));
    }
    check_len("filters", filters.len(), num_conv_layers)?;
    check_len("kernels", kernels.len(), num_conv_layers)?;
    check_len("strides", strides.len(), num_conv_layers)?;
    check_len("affine_widths", affine_widths.len(), num_affine_layers)?;
    check_len("affine_dropouts", affine_dropouts.len(), num_affine_layers)?;
    check_positive("filters", filters)?;
    check_positive("kernels", kernels)?;
    check_positive("strides", strides)?;
    check_positive("affine_widths", affine_widths)?;

    if let Some((layer, &kernel)) = kernels.iter().enumerate().find(|(_, &k)| k % 2 == 0) {
        return Err(HyperparamError::EvenKernel { layer, kernel });
    }
    if let Some((layer, &value)) = affine_dropouts
        .iter()
        .enumerate()
        .find(|(_, &p)| !(0.0..1.0).contains(&p))
    {
        return Err(HyperparamError::InvalidDropout { layer, value });
    }
    Ok(())
}

/// Architecture of the convolutional encoder.
///
/// ```text
/// (batch, C, H, W)
///   → [Conv2d(k, stride, same) → ReLU] × num_conv_layers
///   → flatten
///   → [Linear → ReLU → Dropout] × num_affine_layers
///   → z_mean: Linear(latent_dim), z_log_var: Linear(latent_dim)
/// ```
#[derive(Config, Debug, PartialEq)]
pub struct EncoderHyperparams {
    #[config(default = 4)]
    pub num_conv_layers: usize,
    /// Output channels per conv layer.
    #[config(default = "vec![64, 64, 64, 64]")]
    pub filters: Vec<usize>,
    /// Square kernel size per conv layer (odd).
    #[config(default = "vec![3, 3, 3, 3]")]
    pub kernels: Vec<usize>,
    #[config(default = "vec![1, 2, 1, 1]")]
    pub strides: Vec<usize>,
    #[config(default = 1)]
    pub num_affine_layers: usize,
    #[config(default = "vec![128]")]
    pub affine_widths: Vec<usize>,
    #[config(default = "vec![0.0]")]
    pub affine_dropouts: Vec<f64>,
    /// Dimensionality of the latent space.
    #[config(default = 3)]
    pub latent_dim: usize,
}

impl EncoderHyperparams {
    pub fn validate(&self) -> Result<(), HyperparamError> {
        validate_stack(
            self.num_conv_layers,
            &self.filters,
            &self.kernels,
            &self.strides,
            self.num_affine_layers,
            &self.affine_widths,
            &self.affine_dropouts,
            self.latent_dim,
        )
    }

    /// Activation shape after each conv layer for the given input.
    pub fn conv_output_shapes(&self, input: SampleShape) -> Vec<ConvShape> {
        let (mut h, mut w) = (input.height, input.width);
        self.filters
            .iter()
            .zip(&self.strides)
            .map(|(&filters, &stride)| {
                h = same_conv_output(h, stride);
                w = same_conv_output(w, stride);
                ConvShape::new(filters, h, w)
            })
            .collect()
    }

    /// Shape of the last conv activation (what the decoder must reshape into).
    pub fn final_conv_shape(&self, input: SampleShape) -> ConvShape {
        self.conv_output_shapes(input)
            .last()
            .copied()
            .unwrap_or(ConvShape::new(input.channels, input.height, input.width))
    }

    /// Build an encoder for samples of the given shape.
    pub fn init<B: Backend>(
        &self,
        input: SampleShape,
        device: &B::Device,
    ) -> Result<Encoder<B>, HyperparamError> {
        self.validate()?;
        check_positive("input shape", &[input.height, input.width, input.channels])?;

        let mut convs = Vec::with_capacity(self.num_conv_layers);
        let mut in_channels = input.channels;
        for i in 0..self.num_conv_layers {
            let (k, s) = (self.kernels[i], self.strides[i]);
            let pad = same_padding(k);
            convs.push(
                Conv2dConfig::new([in_channels, self.filters[i]], [k, k])
                    .with_stride([s, s])
                    .with_padding(PaddingConfig2d::Explicit(pad, pad))
                    .init(device),
            );
            in_channels = self.filters[i];
        }

        let conv_shape = self.final_conv_shape(input);
        let mut affine = Vec::with_capacity(self.num_affine_layers);
        let mut dropouts = Vec::with_capacity(self.num_affine_layers);
        let mut d_in = conv_shape.params();
        for (&width, &p) in self.affine_widths.iter().zip(&self.affine_dropouts) {
            affine.push(LinearConfig::new(d_in, width).init(device));
            dropouts.push(DropoutConfig::new(p).init());
            d_in = width;
        }

        Ok(Encoder {
            convs,
            affine,
            dropouts,
            z_mean: LinearConfig::new(d_in, self.latent_dim).init(device),
            z_log_var: LinearConfig::new(d_in, self.latent_dim).init(device),
            input_channels: input.channels,
            input_height: input.height,
            input_width: input.width,
            conv_channels: conv_shape.channels,
            conv_height: conv_shape.height,
            conv_width: conv_shape.width,
            latent_dim: self.latent_dim,
        })
    }
}

/// Architecture of the convolutional decoder.
///
/// ```text
/// (batch, latent_dim)
///   → [Linear → ReLU → Dropout] × num_affine_layers
///   → Linear(enc_conv.params()) → ReLU → reshape (enc C, enc H, enc W)
///   → [ConvTranspose2d(k, stride) → ReLU] × (num_conv_layers - 1)
///   → ConvTranspose2d(k, stride) → sigmoid
///   → (batch, C, H, W)
/// ```
///
/// The last entry of `filters` is the number of output channels.
#[derive(Config, Debug, PartialEq)]
pub struct DecoderHyperparams {
    #[config(default = 4)]
    pub num_conv_layers: usize,
    #[config(default = "vec![64, 64, 64, 1]")]
    pub filters: Vec<usize>,
    #[config(default = "vec![3, 3, 3, 3]")]
    pub kernels: Vec<usize>,
    #[config(default = "vec![1, 1, 2, 1]")]
    pub strides: Vec<usize>,
    #[config(default = 1)]
    pub num_affine_layers: usize,
    #[config(default = "vec![128]")]
    pub affine_widths: Vec<usize>,
    #[config(default = "vec![0.0]")]
    pub affine_dropouts: Vec<f64>,
    /// Must match the encoder's latent dimension.
    #[config(default = 3)]
    pub latent_dim: usize,
}

impl DecoderHyperparams {
    pub fn validate(&self) -> Result<(), HyperparamError> {
        validate_stack(
            self.num_conv_layers,
            &self.filters,
            &self.kernels,
            &self.strides,
            self.num_affine_layers,
            &self.affine_widths,
            &self.affine_dropouts,
            self.latent_dim,
        )
    }

    /// Spatial extents at each stage of the transposed-conv stack.
    ///
    /// Entry `i` is the input extent of layer `i`; the final entry is the
    /// output extent `(H, W)`. Computed backwards from the output.
    pub fn layer_extents(&self, output: SampleShape) -> Vec<(usize, usize)> {
        let mut extents = vec![(output.height, output.width)];
        for &stride in self.strides.iter().rev() {
            let (h, w) = extents[extents.len() - 1];
            extents.push((same_conv_output(h, stride), same_conv_output(w, stride)));
        }
        extents.reverse();
        extents
    }

    /// Build a decoder that maps latents back to samples of `output` shape,
    /// starting from the encoder's final conv activation shape.
    pub fn init<B: Backend>(
        &self,
        output: SampleShape,
        enc_conv: ConvShape,
        device: &B::Device,
    ) -> Result<Decoder<B>, HyperparamError> {
        self.validate()?;
        check_positive("output shape", &[output.height, output.width, output.channels])?;

        let out_filters = self.filters[self.num_conv_layers - 1];
        if out_filters != output.channels {
            return Err(HyperparamError::ChannelMismatch {
                expected: output.channels,
                actual: out_filters,
            });
        }

        let extents = self.layer_extents(output);
        if extents[0] != (enc_conv.height, enc_conv.width) {
            return Err(HyperparamError::ShapeMismatch(format!(
                "decoder strides {:?} expect a {}x{} input grid but the encoder produces {}",
                self.strides, extents[0].0, extents[0].1, enc_conv
            )));
        }

        let mut affine = Vec::with_capacity(self.num_affine_layers);
        let mut dropouts = Vec::with_capacity(self.num_affine_layers);
        let mut d_in = self.latent_dim;
        for (&width, &p) in self.affine_widths.iter().zip(&self.affine_dropouts) {
            affine.push(LinearConfig::new(d_in, width).init(device));
            dropouts.push(DropoutConfig::new(p).init());
            d_in = width;
        }
        let project = LinearConfig::new(d_in, enc_conv.params()).init(device);

        let mut deconvs = Vec::with_capacity(self.num_conv_layers);
        let mut in_channels = enc_conv.channels;
        for i in 0..self.num_conv_layers {
            let (k, s) = (self.kernels[i], self.strides[i]);
            let pad = same_padding(k);
            let (in_h, in_w) = extents[i];
            let (out_h, out_w) = extents[i + 1];
            let pad_h = output_padding(i, in_h, out_h, s)?;
            let pad_w = output_padding(i, in_w, out_w, s)?;
            deconvs.push(
                ConvTranspose2dConfig::new([in_channels, self.filters[i]], [k, k])
                    .with_stride([s, s])
                    .with_padding([pad, pad])
                    .with_padding_out([pad_h, pad_w])
                    .init(device),
            );
            in_channels = self.filters[i];
        }

        Ok(Decoder {
            affine,
            dropouts,
            project,
            deconvs,
            conv_channels: enc_conv.channels,
            conv_height: enc_conv.height,
            conv_width: enc_conv.width,
            output_channels: output.channels,
            output_height: output.height,
            output_width: output.width,
            latent_dim: self.latent_dim,
        })
    }
}

/// Output padding that makes a same-padded transposed conv map `input` to `target`.
///
/// With padding `(k - 1) / 2` and odd `k` the un-padded output is
/// `(input - 1) * stride + 1`.
fn output_padding(
    layer: usize,
    input: usize,
    target: usize,
    stride: usize,
) -> Result<usize, HyperparamError> {
    let base = (input - 1) * stride + 1;
    let padding = target as isize - base as isize;
    if padding < 0 || padding as usize >= stride {
        return Err(HyperparamError::OutputPadding {
            layer,
            padding,
            stride,
        });
    }
    Ok(padding as usize)
}
