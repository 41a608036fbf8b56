mod error;
mod plan;
mod serve;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use demo_core::config::HubConfig;
use error::HubError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "demo-hub")]
#[command(about = "Lists and serves the mock demo backends")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Interface to bind every listener to
    #[arg(long, global = true)]
    host: Option<String>,

    /// Base seed for reproducible mock data
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log filter, e.g. `info` or `demo_services=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every available service
    List,
    /// Show the route table of one service
    Routes {
        /// Service name as shown by `list`
        name: String,
    },
    /// Serve the named services, or every enabled one
    Serve {
        names: Vec<String>,
    },
}

impl Cli {
    fn apply_overrides(&self, config: &mut HubConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = HubConfig::load(cli.config.as_deref())
        .map_err(HubError::from)
        .context("Failed to load hub configuration")?;
    cli.apply_overrides(&mut config);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let catalog = demo_services::catalog();

    match cli.command {
        Commands::List => {
            println!("{:<18} | {:<5} | {}", "NAME", "PORT", "TITLE");
            println!("{:-<18}-+-{:-<5}-+-{:-<30}", "", "", "");
            for d in catalog.descriptors() {
                let port = config.service(d.name).port.unwrap_or(d.default_port);
                println!("{:<18} | {:<5} | {}", d.name, port, d.title);
            }
        }
        Commands::Routes { name } => {
            let service = catalog
                .get(&name)
                .ok_or_else(|| HubError::UnknownService(name.clone()))?;
            let d = service.descriptor();
            println!("{} - {}", d.title, d.tagline);
            println!("{:<6} {}", "GET", "/");
            println!("{:<6} {}", "GET", "/health");
            for route in d.routes {
                println!("{:<6} {:<32} {}", route.method, route.path, route.summary);
            }
        }
        Commands::Serve { names } => {
            serve::serve(&catalog, &config, &names).await?;
        }
    }

    Ok(())
}
