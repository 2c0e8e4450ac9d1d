//! Benchmark driver for the compressor.
//!
//! Reads a binary file of little-endian signed 64-bit integers, builds
//! the compressed representation, verifies it decompresses losslessly,
//! and prints size statistics. Optionally writes the serialized stream
//! next to it.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use neats_rs::{NeatsCompressor, NeatsError};

#[derive(Parser)]
#[command(name = "neats", version, about = "Compress an integer time series")]
struct Args {
    /// Binary file of little-endian 64-bit signed integers.
    input: PathBuf,

    /// Residual width in bits (1..=63).
    #[arg(long, default_value_t = 16)]
    bpc: u8,

    /// Write the serialized compressed stream to this path.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn run(args: &Args) -> Result<(), NeatsError> {
    let bytes = fs::read(&args.input)?;
    if bytes.len() % 8 != 0 {
        return Err(NeatsError::ConfigInvalid(format!(
            "{}: length {} is not a multiple of 8",
            args.input.display(),
            bytes.len()
        )));
    }
    let data: Vec<i64> = bytes
        .chunks_exact(8)
        .map(|c| i64::from_le_bytes(c.try_into().expect("8-byte chunk")))
        .collect();

    let mut compressor = NeatsCompressor::new(args.bpc)?;
    compressor.partition(&data)?;

    let mut decompressed = vec![0i64; compressor.size()];
    compressor.simd_decompress(&mut decompressed);
    let errors = data
        .iter()
        .zip(decompressed.iter())
        .filter(|(a, b)| a != b)
        .count();
    if errors > 0 {
        return Err(NeatsError::ConfigInvalid(format!(
            "decompression mismatch on {} of {} elements",
            errors,
            data.len()
        )));
    }

    let compressed_bits = compressor.size_in_bits();
    let uncompressed_bits = data.len() * 64;
    println!("dataset:           {}", args.input.display());
    println!("elements:          {}", data.len());
    println!("segments:          {}", compressor.segment_count());
    println!("bpc:               {}", compressor.bits_per_residual());
    println!("compressed bits:   {}", compressed_bits);
    println!(
        "compression ratio: {:.4}",
        compressed_bits as f64 / uncompressed_bits as f64
    );

    if let Some(path) = &args.out {
        let file = fs::File::create(path)?;
        let written = compressor.serialize(file)?;
        println!("serialized:        {} bytes -> {}", written, path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
