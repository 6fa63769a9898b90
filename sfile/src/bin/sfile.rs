use std::path::{Path, PathBuf};

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Parser, Subcommand};
use sfile::{RepositoryCatalog, SfileConfig, SfileRepository};
use sfile_tile_utils::{DataFormat, TileCoord, resolve};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Defines the styles used for the CLI help output.
const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, PartialEq, Debug)]
#[command(
    version,
    name = "sfile",
    about = "A utility to inspect repositories of sharded SQLite raster tiles",
    after_help = "Use RUST_LOG environment variable to control logging level, e.g. RUST_LOG=debug or RUST_LOG=sfile=debug.",
    styles = HELP_STYLES
)]
pub struct Args {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, PartialEq, Debug)]
enum Commands {
    /// List all repositories below the root directory as JSON, analyzing them if needed
    #[command(name = "list", alias = "ls")]
    List {
        /// Directory containing the repositories, overrides `repository_root` of the config
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Read a single tile from a repository
    #[command(name = "tile", alias = "get")]
    Tile {
        /// Repository directory
        repository: PathBuf,
        z: u8,
        x: u32,
        y: u32,
        /// Write the tile bytes to this file instead of describing them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show where a tile is stored inside a repository
    #[command(name = "resolve")]
    Resolve { z: u8, x: u32, y: u32 },
    /// Scan a repository and show per-zoom statistics, without saving anything
    #[command(name = "summary", alias = "info")]
    Summary { repository: PathBuf },
    /// Print the descriptor of a repository, analyzing it if there is no cached one
    #[command(name = "analyze")]
    Analyze {
        repository: PathBuf,
        /// Discard the cached descriptor and scan again
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("sfile=info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_target(false)
        .with_env_filter(env_filter)
        .init();

    if let Err(err) = main_int().await {
        error!("{err:#}");
        std::process::exit(1);
    }
}

async fn main_int() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(file) => SfileConfig::read(file)?,
        None => SfileConfig::default(),
    };

    match args.command {
        Commands::List { root } => {
            if let Some(root) = root {
                config.repository_root = Some(root);
            }
            let descriptors = config.catalog().list().await?;
            println!("{}", serde_json::to_string_pretty(&descriptors)?);
        }
        Commands::Tile {
            repository,
            z,
            x,
            y,
            output,
        } => {
            let repo = SfileRepository::new(&repository).await?;
            let xyz = TileCoord::new(z, x, y);
            let data = repo.get_tile(xyz).await?;
            if let Some(output) = output {
                tokio::fs::write(&output, &data).await?;
                println!("Saved {} bytes to {}", data.len(), output.display());
            } else {
                let format = DataFormat::detect(&data)
                    .map_or("unknown format", |f| f.content_type());
                println!("Tile {xyz}: {} bytes, {format}", data.len());
            }
        }
        Commands::Resolve { z, x, y } => {
            let address = resolve(TileCoord::new(z, x, y));
            print!("{}", serde_yaml::to_string(&address)?);
        }
        Commands::Summary { repository } => {
            let summary = config.scanner().scan(&repository).await?;
            println!("{summary}");
        }
        Commands::Analyze { repository, force } => {
            let catalog = RepositoryCatalog::new(parent_dir(&repository), config.scanner());
            let descriptor = if force {
                catalog.reanalyze(&repository).await?
            } else {
                catalog.describe(&repository).await
            };
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
    }

    Ok(())
}

fn parent_dir(repository: &Path) -> PathBuf {
    repository
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
