use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use exifcheck::config::{Config, OutputFormat};
use exifcheck::export::{export_folder, export_image};
use exifcheck::folder::scan_folder;
use exifcheck::{ExtractMode, check_validity, inspect};

#[derive(Parser)]
#[command(author, version, about = "A tool to validate JPG/HEIC images and read their EXIF metadata")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log per-file decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize with a default config file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Check whether images are supported and carry metadata
    Check {
        /// Image files to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print the metadata of one image
    Extract {
        /// Image file
        path: PathBuf,

        /// Print JSON instead of the configured format
        #[arg(long)]
        json: bool,
    },

    /// List the supported images in a folder
    Scan {
        /// Folder to scan
        dir: PathBuf,

        /// Walk sub-folders as well
        #[arg(short, long)]
        recursive: bool,
    },

    /// Save an image, converting to JPEG when the destination is .jpg/.jpeg
    Export {
        /// Source image
        src: PathBuf,

        /// Destination file
        dest: PathBuf,
    },

    /// Save several images into one folder, keeping their file names
    ExportDir {
        /// Destination folder
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        /// Images to save
        #[arg(required = true)]
        srcs: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match &cli.command {
        Commands::Init { force } => init_config(&cli.config, *force),
        Commands::Check { paths } => {
            for path in paths {
                let (supported, has_metadata) = check_validity(path);
                println!(
                    "{}: supported={} has_metadata={}",
                    path.display(),
                    supported,
                    has_metadata
                );
            }
            Ok(())
        }
        Commands::Extract { path, json } => {
            let config = Config::resolve(&cli.config)?;
            let format = if *json { OutputFormat::Json } else { config.output };
            print_metadata(path, format, &config.not_available)
        }
        Commands::Scan { dir, recursive } => {
            let config = Config::resolve(&cli.config)?;
            scan(dir, *recursive || config.recursive_scan)
        }
        Commands::Export { src, dest } => {
            let config = Config::resolve(&cli.config)?;
            let outcome = export_image(src, dest, config.jpeg_quality)?;
            println!("{} to {}", outcome, dest.display());
            Ok(())
        }
        Commands::ExportDir { out, srcs } => {
            let config = Config::resolve(&cli.config)?;
            let result = export_folder(srcs, out, config.jpeg_quality)?;
            println!("{}", result);
            Ok(())
        }
    }
}

fn init_config(config_path_opt: &Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = Config::get_config_path(config_path_opt);

    if config_path.exists() && !force {
        println!("Config file already exists at {}", config_path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = Config::default();
    config
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!("Created config file at {}", config_path.display());
    Ok(())
}

fn print_metadata(path: &Path, format: OutputFormat, not_available: &str) -> Result<()> {
    let inspection = inspect(path, ExtractMode::Full);

    if format == OutputFormat::Json {
        let json = serde_json::to_string_pretty(&inspection)
            .context("Failed to serialize metadata")?;
        println!("{}", json);
        return Ok(());
    }

    println!("File: {}", path.display());
    let Some(metadata) = inspection.metadata else {
        println!("Unsupported image: only JPG / HEIC files that decode are accepted");
        return Ok(());
    };

    if !inspection.has_metadata {
        println!("No embedded metadata found");
    }
    for (label, value) in metadata.labeled_fields() {
        println!("  {:<14} {}", format!("{}:", label), value.as_deref().unwrap_or(not_available));
    }
    Ok(())
}

fn scan(dir: &Path, recursive: bool) -> Result<()> {
    let images = scan_folder(dir, recursive)?;
    if images.is_empty() {
        println!("No JPG / HEIC images found in {}", dir.display());
        return Ok(());
    }

    println!("Found {} candidate images in {}", images.len(), dir.display());
    for path in &images {
        let inspection = inspect(path, ExtractMode::Full);
        let taken = inspection
            .metadata
            .as_ref()
            .and_then(|m| m.capture_time())
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} supported={} has_metadata={} taken={}",
            path.display(),
            inspection.supported,
            inspection.has_metadata,
            taken
        );
    }
    Ok(())
}
