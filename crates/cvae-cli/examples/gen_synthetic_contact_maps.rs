//! Generate a synthetic contact-map `.npz` for smoke-testing the `cvae` pipeline.
//!
//! Usage: cargo run -p cvae-cli --example gen_synthetic_contact_maps -- cvae_input.npz [frames] [residues]
//!
//! Each frame mimics a folding trajectory: a diagonal band of backbone contacts
//! plus a hairpin whose contacts switch on progressively, with random noise.

use std::fs::File;

use ndarray::Array4;
use ndarray_npy::NpzWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "cvae_input.npz".to_string());
    let frames: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(200);
    let residues: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(22);

    let mut rng = StdRng::seed_from_u64(0);
    let mut maps = Array4::<f32>::zeros((frames, residues, residues, 1));
    for f in 0..frames {
        let folded = f as f64 / frames.max(1) as f64;
        for i in 0..residues {
            for j in 0..residues {
                let backbone = i.abs_diff(j) <= 2;
                // Antiparallel hairpin: residue i pairs with residues-1-i.
                let hairpin = (i + j + 1).abs_diff(residues) <= 1 && rng.gen_bool(folded);
                let noise = rng.gen_bool(0.02);
                if backbone || hairpin || noise {
                    maps[[f, i, j, 0]] = 1.0;
                    maps[[f, j, i, 0]] = 1.0;
                }
            }
        }
    }

    let mut npz = NpzWriter::new(File::create(&output)?);
    npz.add_array(contact_maps::CONTACT_MAPS_KEY, &maps)?;
    npz.finish()?;
    println!("Wrote {frames} frames of {residues}x{residues} contact maps to {output}");
    Ok(())
}
