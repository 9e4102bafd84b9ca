//! Livseg Application
//!
//! Sliding-window liver and tumor segmentation driver.
//!
//! Features:
//! - JSON run configuration with CLI overrides
//! - Overlapping-window inference with optional multi-core scoring
//! - Arg-max label decoding and per-class Dice against ground truth

mod config;
mod constants;
mod errors;
mod model;
mod phantom;
mod pipeline;

use clap::Parser;
use config::RunConfig;
use errors::AppError;
use std::path::PathBuf;
use tracing::info;

/// Livseg - Volumetric Liver and Tumor Segmentation
#[derive(Parser, Debug)]
#[command(name = "livseg")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Edge length of the synthetic phantom
    #[arg(long)]
    size: Option<usize>,

    /// Sliding window edge length
    #[arg(long)]
    patch_size: Option<usize>,

    /// Step between window origins
    #[arg(long)]
    stride: Option<usize>,

    /// Edge length scans are resampled to
    #[arg(long)]
    target_size: Option<usize>,

    /// Score windows on all cores
    #[arg(long)]
    parallel: bool,

    /// Phantom noise seed
    #[arg(long)]
    seed: Option<u64>,

    /// Phantom noise amplitude in HU
    #[arg(long)]
    noise: Option<f32>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Load the configured file (or defaults) and apply flag overrides.
    fn resolve_config(&self) -> Result<RunConfig, AppError> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };

        if let Some(size) = self.size {
            config.phantom.size = size;
        }
        if let Some(patch) = self.patch_size {
            config.patch_size = [patch; 3];
        }
        if let Some(stride) = self.stride {
            config.stride = [stride; 3];
        }
        if let Some(target) = self.target_size {
            config.target_size = [target; 3];
        }
        if self.parallel {
            config.parallel = true;
        }
        if let Some(seed) = self.seed {
            config.phantom.seed = seed;
        }
        if let Some(noise) = self.noise {
            config.phantom.noise = noise;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn run(args: &Args) -> Result<(), AppError> {
    let config = args.resolve_config()?;
    info!(
        "Segmenting {}^3 phantom resampled to {:?}",
        config.phantom.size, config.target_size
    );

    let report = pipeline::run(&config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("livseg error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from(["livseg", "--patch-size", "32", "--stride", "16", "--parallel", "--seed", "3"]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.patch_size, [32; 3]);
        assert_eq!(config.stride, [16; 3]);
        assert!(config.parallel);
        assert_eq!(config.phantom.seed, 3);
        assert_eq!(config.target_size, [constants::TARGET_SIZE; 3]);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::parse_from(["livseg", "--stride", "0"]);
        assert!(matches!(args.resolve_config(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_missing_config_file() {
        let args = Args::parse_from(["livseg", "--config", "/nonexistent/livseg.json"]);
        assert!(matches!(args.resolve_config(), Err(AppError::Io(_))));
    }
}
