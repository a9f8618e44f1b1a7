use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::io::Write;
use std::path::PathBuf;

use mosaic_lib::{convert_file, make_tile_file, render_file, MosaicSettings, PaletteSource};

/// Photomosaic generation tools
#[derive(Parser)]
#[command(name = "mosaic-toolkit")]
#[command(version)]
#[command(about = "Rebuild an image out of solid-color or image tiles", long_about = None)]
struct Cli {
    /// Show per-tile and per-worker progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an image into a mosaic
    Mosaic {
        /// Source image path
        input: PathBuf,

        /// Output image path, `-` writes PNG to stdout
        #[arg(short, long, default_value = "mosaic.png")]
        output: PathBuf,

        /// JSON settings file; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Width in number of tiles
        #[arg(short = 'x', long)]
        width: Option<u32>,

        /// Height in number of tiles
        #[arg(short = 'y', long)]
        height: Option<u32>,

        /// Output pixels per tile edge
        #[arg(short, long)]
        size: Option<u32>,

        /// Tile opacity, 0 - transparent, 255 - opaque
        #[arg(short, long)]
        alpha: Option<u8>,

        /// Directory of images to use as tiles (default: solid web-safe colors)
        #[arg(short = 'd', long)]
        tiles: Option<PathBuf>,

        /// Number of sampling workers
        #[arg(long)]
        workers: Option<usize>,

        /// Use library images as-is instead of cropping them to squares
        #[arg(long)]
        no_normalize: bool,

        /// Print the conversion report as JSON
        #[arg(long)]
        report: bool,
    },

    /// Crop and resize an image into a square tile
    Tile {
        /// Source image path
        input: PathBuf,

        /// Output tile path
        output: PathBuf,

        /// Tile edge in pixels
        #[arg(short, long, default_value = "50")]
        size: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .context("Failed to initialise logger")?;

    match cli.command {
        Commands::Mosaic {
            input,
            output,
            config,
            width,
            height,
            size,
            alpha,
            tiles,
            workers,
            no_normalize,
            report,
        } => {
            let mut settings = match &config {
                Some(path) => MosaicSettings::from_json_file(path)
                    .with_context(|| format!("Failed to read settings from {}", path.display()))?,
                None => MosaicSettings::default(),
            };
            if let Some(v) = width {
                settings.grid_width = v;
            }
            if let Some(v) = height {
                settings.grid_height = v;
            }
            if let Some(v) = size {
                settings.tile_size = v;
            }
            if let Some(v) = alpha {
                settings.alpha = v;
            }
            if let Some(v) = workers {
                settings.workers = v;
            }
            if let Some(path) = tiles {
                settings.palette = PaletteSource::Directory { path };
            }
            if no_normalize {
                settings.normalize_tiles = false;
            }

            if output.as_os_str() == "-" {
                let (png, result) = render_file(input.clone(), settings)
                    .await
                    .with_context(|| format!("Failed to build mosaic of {}", input.display()))?;
                std::io::stdout()
                    .write_all(&png)
                    .context("Failed to write mosaic to stdout")?;
                log::info!(
                    "Wrote {} bytes ({}x{}, {} cells)",
                    png.len(),
                    result.canvas_size.0,
                    result.canvas_size.1,
                    result.cells
                );
                if report {
                    eprintln!("{}", serde_json::to_string_pretty(&result)?);
                }
                return Ok(());
            }

            let result = convert_file(input.clone(), output.clone(), settings)
                .await
                .with_context(|| format!("Failed to build mosaic of {}", input.display()))?;

            log::info!(
                "Wrote {} ({}x{}, {} cells)",
                output.display(),
                result.canvas_size.0,
                result.canvas_size.1,
                result.cells
            );
            if report {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }

        Commands::Tile { input, output, size } => {
            let (w, h) = make_tile_file(input.clone(), output.clone(), size)
                .await
                .with_context(|| format!("Failed to make a tile from {}", input.display()))?;
            log::info!("Wrote {} ({}x{})", output.display(), w, h);
        }
    }

    Ok(())
}
