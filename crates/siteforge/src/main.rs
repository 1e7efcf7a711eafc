//! SiteForge CLI - block-based website builder.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "siteforge")]
#[command(about = "Block-based website builder and publisher")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to siteforge.toml config file
    #[arg(short, long, default_value = "siteforge.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a config file and a starter site document
    Init {
        /// Template to start from
        #[arg(short, long, default_value = "business-landing")]
        template: String,

        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Run the API server, publish workers and site host
    Serve {
        /// Port to listen on (defaults to config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Preview a site document with live reload
    Preview {
        /// Site document (JSON)
        file: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "7777")]
        port: u16,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Render a directory of site documents to static HTML
    Build {
        /// Directory of site documents
        #[arg(short, long, default_value = "sites")]
        src: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "dist")]
        output: PathBuf,

        /// Skip CSS minification
        #[arg(long)]
        no_minify: bool,
    },

    /// Render one site document
    Render {
        /// Site document (JSON)
        file: PathBuf,

        /// Write HTML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available templates
    Templates {
        /// Only show this category
        #[arg(short = 'C', long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Init { template, yes } => {
            commands::init::run(&config, &cli.config, &template, yes).await?;
        }
        Commands::Serve { port } => {
            commands::serve::run(config, port).await?;
        }
        Commands::Preview { file, port, no_open } => {
            commands::preview::run(&config, file, port, !no_open).await?;
        }
        Commands::Build { src, output, no_minify } => {
            let minify = if no_minify { Some(false) } else { None };
            commands::build::run(&config, src, output, minify).await?;
        }
        Commands::Render { file, output } => {
            commands::render::run(&config, &file, output.as_deref()).await?;
        }
        Commands::Templates { category } => {
            commands::templates::run(&config, category).await?;
        }
    }

    Ok(())
}
