//! mictool - inspect, convert and resample mic grid files
//!
//! Usage:
//!   mictool info <input>
//!   mictool convert <input> <output>
//!   mictool refine <input> <output> --min-res 0.25
//!   mictool init <reference> <output> --res 0.5
//!
//! Files ending in `.bin` are binary snapshots, anything else is mic text.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::MictoolConfig;
use mic::{Deserializer, GridFile, GridType, Serializer};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mictool")]
#[command(about = "Mic microstructure grid file tool", long_about = None)]
struct Cli {
    /// TOML config file (falls back to $MICTOOL_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Grid type of the input files: triangular or square
    #[arg(long, global = true)]
    grid: Option<GridType>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of a grid file
    Info {
        /// Input file
        input: PathBuf,
    },
    /// Convert between mic text and binary snapshots
    Convert {
        /// Input file
        input: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// Subdivide square voxels down to a resolution
    Refine {
        /// Input file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Largest allowed voxel side length
        #[arg(long)]
        min_res: Option<f64>,
    },
    /// Build a fresh square grid over the sample limits of a reference file
    Init {
        /// File providing origin and sample side length
        reference: PathBuf,
        /// Output file
        output: PathBuf,
        /// Voxel side length of the new grid
        #[arg(long)]
        res: Option<f64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = MictoolConfig::load(cli.config.as_deref())?;
    let grid_type = cli.grid.unwrap_or(config.grid);

    match cli.command {
        Commands::Info { input } => {
            let grid = load(&input, grid_type)?;
            print_info(&input, &grid);
        }
        Commands::Convert { input, output } => {
            let grid = load(&input, grid_type)?;
            store(&output, &grid)?;
        }
        Commands::Refine {
            input,
            output,
            min_res,
        } => {
            let resolution = min_res
                .or(config.min_resolution)
                .context("No resolution given: pass --min-res or set min_resolution")?;
            let mut grid = load(&input, grid_type)?;
            let before = grid.len();
            grid.set_min_resolution(resolution)
                .with_context(|| format!("Failed to refine {}", input.display()))?;
            tracing::info!("Refined {} voxels into {}", before, grid.len());
            store(&output, &grid)?;
        }
        Commands::Init {
            reference,
            output,
            res,
        } => {
            let resolution = res
                .or(config.init_resolution)
                .context("No resolution given: pass --res or set init_resolution")?;
            let reference_grid = load(&reference, grid_type)?;
            let mut grid = GridFile::create(grid_type);
            grid.initialize_sample_limits(&reference_grid)?;
            grid.initialize_to_resolution(resolution)
                .with_context(|| format!("Failed to initialize from {}", reference.display()))?;
            tracing::info!("Generated {} voxels", grid.len());
            store(&output, &grid)?;
        }
    }

    Ok(())
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bin")
}

/// Read a grid of the given type from text or a binary snapshot
fn load(path: &Path, grid_type: GridType) -> Result<GridFile> {
    if is_binary(path) {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let grid = restore_snapshot(&bytes, grid_type)
            .with_context(|| format!("Failed to restore snapshot {}", path.display()))?;
        tracing::info!("Restored {} voxels from {}", grid.len(), path.display());
        return Ok(grid);
    }

    let mut grid = GridFile::create(grid_type);
    let summary = grid
        .read(path)
        .with_context(|| format!("Failed to read {} grid from {}", grid_type, path.display()))?;
    if !summary.is_clean() {
        tracing::warn!(
            "{}: skipped {} malformed rows",
            path.display(),
            summary.skipped.len()
        );
    }
    tracing::info!("Loaded {} voxels from {}", summary.voxels, path.display());
    Ok(grid)
}

/// Write a grid as text or a binary snapshot depending on the extension
fn store(path: &Path, grid: &GridFile) -> Result<()> {
    if is_binary(path) {
        let bytes = snapshot_bytes(grid)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create snapshot in {}", dir.display()))?;
        tmp.write_all(&bytes)
            .with_context(|| format!("Failed to write snapshot for {}", path.display()))?;
        tmp.persist(path)
            .with_context(|| format!("Failed to move snapshot into {}", path.display()))?;
    } else {
        grid.write(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    tracing::info!("Wrote {} voxels to {}", grid.len(), path.display());
    Ok(())
}

/// Snapshot layout: grid type tag, then the grid's own save payload
fn snapshot_bytes(grid: &GridFile) -> Result<Vec<u8>> {
    let mut buf = Serializer::new();
    buf.insert_compact_obj(&grid.grid_type().tag())?;
    grid.save(&mut buf)?;
    Ok(buf.into_bytes())
}

fn restore_snapshot(bytes: &[u8], expected: GridType) -> Result<GridFile> {
    let mut buf = Deserializer::new(bytes);
    let found = GridType::try_from(buf.get_compact_obj::<i32>()?)?;
    if found != expected {
        bail!("snapshot holds a {} grid, expected {}", found, expected);
    }

    let mut grid = GridFile::create(found);
    grid.restore(&mut buf)?;
    if buf.remaining() != 0 {
        bail!("{} trailing bytes after {} grid", buf.remaining(), found);
    }
    Ok(grid)
}

fn print_info(path: &Path, grid: &GridFile) {
    println!("File:           {}", path.display());
    println!("Grid type:      {}", grid.grid_type());
    println!("Voxels:         {}", grid.len());
    println!("Initial side:   {}", grid.initial_side_length());
    match grid.min_side_length() {
        Some(side) => println!("Smallest voxel: {}", side),
        None => println!("Smallest voxel: -"),
    }

    match grid {
        GridFile::Triangular(tri) => {
            let deepest = tri.iter().map(|v| v.generation).max().unwrap_or(0);
            println!("Deepest generation: {}", deepest);
        }
        GridFile::Square(square) => {
            let origin = square.origin();
            println!("Origin:         {} {} {}", origin.x, origin.y, origin.z);
            println!("Sample side:    {}", square.sample_side_length());
            println!("Voxel side:     {}", square.voxel_side_length());
        }
    }
}
