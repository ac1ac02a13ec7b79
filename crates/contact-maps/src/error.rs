use std::path::PathBuf;

/// Errors raised while loading, validating or naming contact-map data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Input file or output directory does not exist.
    #[error("path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Dataset cannot be used for training (too few samples, bad rank, empty axes).
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// Model identifier would produce an unsafe or empty file name.
    #[error("invalid model id {0:?}: expected ASCII letters, digits, '-' or '_'")]
    InvalidModelId(String),

    /// Container file has no array under the expected name.
    #[error("{} has no array named {name:?}", path.display())]
    MissingArray { path: PathBuf, name: String },

    /// File extension is not a supported container.
    #[error("unsupported input format: {} ({hint})", path.display())]
    UnsupportedFormat { path: PathBuf, hint: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("npy error: {0}")]
    Npy(#[from] ndarray_npy::ReadNpyError),

    #[error("npz error: {0}")]
    Npz(#[from] ndarray_npy::ReadNpzError),

    #[cfg(feature = "hdf5")]
    #[error("hdf5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}
