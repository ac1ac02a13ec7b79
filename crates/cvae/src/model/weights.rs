//! Weight persistence at exact file paths.
//!
//! burn's file recorders append their own extension; artifact names are
//! fixed by the caller, so records are serialised to bytes with the named
//! MessagePack recorder and written verbatim.

use std::path::Path;

use anyhow::Context;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder};

type WeightRecorder = NamedMpkBytesRecorder<FullPrecisionSettings>;

/// Serialise `module` at full precision and write it to `path`.
pub fn save_module<B: Backend, M: Module<B>>(module: &M, path: &Path) -> anyhow::Result<()> {
    let recorder = WeightRecorder::default();
    let bytes = <WeightRecorder as Recorder<B>>::record(&recorder, module.clone().into_record(), ())
        .map_err(|e| anyhow::anyhow!("Failed to serialise weights for {}: {e}", path.display()))?;
    std::fs::write(path, &bytes)
        .with_context(|| format!("Failed to write weights to {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved weights");
    Ok(())
}

/// Load weights written by [`save_module`] into a freshly initialised `module`.
pub fn load_module<B: Backend, M: Module<B>>(
    module: M,
    path: &Path,
    device: &B::Device,
) -> anyhow::Result<M> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read weights from {}", path.display()))?;
    let recorder = WeightRecorder::default();
    let record = <WeightRecorder as Recorder<B>>::load(&recorder, bytes, device)
        .map_err(|e| anyhow::anyhow!("Failed to load weights from {}: {e}", path.display()))?;
    Ok(module.load_record(record))
}
