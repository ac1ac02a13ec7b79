//! Readers for contact-map container files.
//!
//! The array is always materialised fully into memory. File handles are scoped
//! to the reader functions and are closed on return, whether loading succeeded
//! or not.

use std::fs::File;
use std::path::Path;

use ndarray::{ArrayD, IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpyError, ReadNpzError};

use crate::dataset::ContactMapDataset;
use crate::error::DataError;

/// Name of the contact-map array inside `.npz` and HDF5 containers.
pub const CONTACT_MAPS_KEY: &str = "contact_maps";

/// Load a contact-map dataset, dispatching on the file extension.
///
/// - `.npy`: the file holds the array itself
/// - `.npz`: the array is the `contact_maps` member
/// - `.h5` / `.hdf5`: the array is the `contact_maps` dataset (`hdf5` feature)
///
/// `f32`, `f64` and `u8` element types are accepted and converted to `f32`.
pub fn load_contact_maps(path: &Path) -> Result<ContactMapDataset, DataError> {
    if !path.exists() {
        return Err(DataError::PathNotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let data = match ext.as_deref() {
        Some("npy") => read_npy(path)?,
        Some("npz") => read_npz(path)?,
        Some("h5") | Some("hdf5") => read_hdf5(path)?,
        _ => {
            return Err(DataError::UnsupportedFormat {
                path: path.to_path_buf(),
                hint: "expected .npy, .npz, .h5 or .hdf5".to_string(),
            })
        }
    };

    let dataset = ContactMapDataset::new(data)?;
    tracing::info!(
        path = %path.display(),
        samples = dataset.len(),
        sample_shape = %dataset.sample_shape(),
        "Loaded contact maps"
    );
    if let Some((lo, hi)) = dataset.value_range() {
        if lo < 0.0 || hi > 1.0 {
            tracing::warn!(
                min = lo,
                max = hi,
                "Contact-map values fall outside [0, 1]; binary cross-entropy expects contact probabilities"
            );
        }
    }
    Ok(dataset)
}

fn is_wrong_dtype(err: &ReadNpyError) -> bool {
    matches!(err, ReadNpyError::WrongDescriptor(..))
}

fn read_npy(path: &Path) -> Result<ArrayD<f32>, DataError> {
    match ndarray_npy::read_npy::<_, ArrayD<f32>>(path) {
        Ok(data) => return Ok(data),
        Err(e) if is_wrong_dtype(&e) => {}
        Err(e) => return Err(e.into()),
    }
    match ndarray_npy::read_npy::<_, ArrayD<f64>>(path) {
        Ok(data) => return Ok(data.mapv(|v| v as f32)),
        Err(e) if is_wrong_dtype(&e) => {}
        Err(e) => return Err(e.into()),
    }
    let data: ArrayD<u8> = ndarray_npy::read_npy(path)?;
    Ok(data.mapv(f32::from))
}

fn read_npz(path: &Path) -> Result<ArrayD<f32>, DataError> {
    let mut npz = NpzReader::new(File::open(path)?)?;
    let name = npz
        .names()?
        .into_iter()
        .find(|n| n == CONTACT_MAPS_KEY || n.strip_suffix(".npy") == Some(CONTACT_MAPS_KEY))
        .ok_or_else(|| DataError::MissingArray {
            path: path.to_path_buf(),
            name: CONTACT_MAPS_KEY.to_string(),
        })?;

    match npz.by_name::<OwnedRepr<f32>, IxDyn>(&name) {
        Ok(data) => return Ok(data),
        Err(ReadNpzError::Npy(e)) if is_wrong_dtype(&e) => {}
        Err(e) => return Err(e.into()),
    }
    match npz.by_name::<OwnedRepr<f64>, IxDyn>(&name) {
        Ok(data) => return Ok(data.mapv(|v| v as f32)),
        Err(ReadNpzError::Npy(e)) if is_wrong_dtype(&e) => {}
        Err(e) => return Err(e.into()),
    }
    let data = npz.by_name::<OwnedRepr<u8>, IxDyn>(&name)?;
    Ok(data.mapv(f32::from))
}

#[cfg(feature = "hdf5")]
fn read_hdf5(path: &Path) -> Result<ArrayD<f32>, DataError> {
    let file = hdf5::File::open(path)?;
    let dataset = file
        .dataset(CONTACT_MAPS_KEY)
        .map_err(|_| DataError::MissingArray {
            path: path.to_path_buf(),
            name: CONTACT_MAPS_KEY.to_string(),
        })?;

    use hdf5::types::{FloatSize, IntSize, TypeDescriptor};
    let data = match dataset.dtype()?.to_descriptor()? {
        TypeDescriptor::Float(FloatSize::U8) => dataset.read_dyn::<f64>()?.mapv(|v| v as f32),
        TypeDescriptor::Unsigned(IntSize::U1) => dataset.read_dyn::<u8>()?.mapv(f32::from),
        _ => dataset.read_dyn::<f32>()?,
    };
    Ok(data)
}

#[cfg(not(feature = "hdf5"))]
fn read_hdf5(path: &Path) -> Result<ArrayD<f32>, DataError> {
    Err(DataError::UnsupportedFormat {
        path: path.to_path_buf(),
        hint: "HDF5 support is disabled; rebuild with `--features hdf5` or convert to .npz".to_string(),
    })
}
