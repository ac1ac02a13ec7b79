//! Backend and device selection.
//!
//! The GPU index from `--gpu` is turned into an explicit device value that is
//! handed to model construction and training. Nothing touches the process
//! environment.

use burn::backend::Autodiff;
use burn::prelude::Backend;

#[cfg(not(feature = "wgpu"))]
use burn::backend::ndarray::{NdArray, NdArrayDevice};
#[cfg(feature = "wgpu")]
use burn::backend::wgpu::{Wgpu, WgpuDevice};

/// Autodiff backend used for training.
#[cfg(not(feature = "wgpu"))]
pub type TrainBackend = Autodiff<NdArray<f32>>;
/// Autodiff backend used for training.
#[cfg(feature = "wgpu")]
pub type TrainBackend = Autodiff<Wgpu>;

pub type TrainDevice = <TrainBackend as Backend>::Device;

/// Device chosen for a run, plus the GPU index that was requested.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    gpu: usize,
    device: TrainDevice,
}

impl DeviceContext {
    /// Select the device for GPU index `gpu`.
    ///
    /// CPU builds ignore the index and warn when it is non-zero.
    #[cfg(not(feature = "wgpu"))]
    pub fn new(gpu: usize) -> Self {
        if gpu != 0 {
            tracing::warn!(
                gpu,
                "Built without the `wgpu` feature; training on CPU and ignoring --gpu"
            );
        }
        Self {
            gpu,
            device: NdArrayDevice::Cpu,
        }
    }

    /// Select the device for GPU index `gpu`.
    #[cfg(feature = "wgpu")]
    pub fn new(gpu: usize) -> Self {
        Self {
            gpu,
            device: WgpuDevice::DiscreteGpu(gpu),
        }
    }

    pub fn gpu(&self) -> usize {
        self.gpu
    }

    pub fn device(&self) -> &TrainDevice {
        &self.device
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        format!("{:?}", self.device)
    }
}
