//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Terrain tool command-line arguments.
///
/// CLI values override settings loaded from `terrain.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "vista", about = "Endless procedural terrain")]
pub struct CliArgs {
    /// Noise seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Index into the supported chunk sizes (0-8).
    #[arg(long)]
    pub chunk_size_index: Option<usize>,

    /// Use flat shading.
    #[arg(long)]
    pub flat_shading: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for preview images.
    #[arg(long)]
    pub preview_dir: Option<PathBuf>,

    /// Number of simulated frames the demo walks the viewer.
    #[arg(long, default_value_t = 120)]
    pub steps: u32,

    /// Viewer distance travelled per simulated frame.
    #[arg(long, default_value_t = 8.0)]
    pub step_length: f32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.height.noise.seed = seed;
        }
        if let Some(index) = args.chunk_size_index {
            self.mesh.chunk_size_index = index;
        }
        if let Some(flat) = args.flat_shading {
            self.mesh.use_flat_shading = flat;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
