//! CLI entry point for cms-blog

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cms-blog")]
#[command(version)]
#[command(about = "A blog front end for a headless CMS", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// CMS API endpoint, overrides cms.endpoint
    #[arg(long, global = true, env = "CMS_ENDPOINT")]
    endpoint: Option<String>,

    /// CMS access token, overrides cms.access_token
    #[arg(long, global = true, env = "CMS_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a local server rendering pages on request
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate,

    /// List posts, loading more pages on request
    List {
        /// Load every page without prompting
        #[arg(short, long)]
        all: bool,
    },

    /// Clean the public folder
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "cms_blog=debug,info"
    } else {
        "cms_blog=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let load = || -> Result<cms_blog::Blog> {
        let blog = cms_blog::Blog::new(&base_dir)?;
        Ok(blog.with_cms(cli.endpoint.clone(), cli.access_token.clone()))
    };

    match cli.command {
        Commands::Serve { port, ip } => {
            let blog = load()?;
            let client = blog.client()?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            cms_blog::server::start(&blog, client, &ip, port).await?;
        }

        Commands::Generate => {
            let blog = load()?;
            let client = blog.client()?;
            tracing::info!("Generating static files...");
            blog.generate(client.as_ref()).await?;
            println!("Generated successfully!");
        }

        Commands::List { all } => {
            let blog = load()?;
            let client = blog.client()?;
            cms_blog::commands::list::run(&blog, client.as_ref(), client.clone(), all).await?;
        }

        Commands::Clean => {
            let blog = load()?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("cms-blog version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
