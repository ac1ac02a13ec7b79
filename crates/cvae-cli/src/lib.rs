//! Training pipeline behind the `cvae` binary.
//!
//! Loads a contact-map file, splits it 80/20, builds the encoder and decoder
//! from defaults, an optional TOML file and CLI flags, trains the VAE and
//! writes the eight run artifacts into the output directory.

pub mod config;
pub mod device;
pub mod pipeline;
