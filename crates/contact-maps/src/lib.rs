//! Contact-map datasets for convolutional VAE training.
//!
//! Loads the `contact_maps` array produced by molecular-dynamics post-processing,
//! splits it 80/20 into train and validation sets, and derives the file names
//! under which a training run persists its artifacts.

pub mod artifacts;
pub mod dataset;
pub mod error;
pub mod loader;
pub mod partition;

pub use artifacts::{ArtifactKind, ArtifactPathBuilder, ArtifactSet};
pub use dataset::{ContactMapDataset, SampleShape};
pub use error::DataError;
pub use loader::{load_contact_maps, CONTACT_MAPS_KEY};
pub use partition::{partition, split_index, DatasetPartitioner, Split, TRAIN_FRACTION};
