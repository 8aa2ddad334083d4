use anyhow::Context;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use trowel::settings::{Settings, DEFAULT_CONFIG_FILE};
use trowel::swagger::SwaggerApi;

/// Generates an async python client from an OpenAPI 3 document.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Url or file path of the OpenAPI document
    #[arg(long)]
    url: Option<String>,

    /// Directory the client package is written to
    #[arg(long)]
    dirname: Option<String>,

    /// Write the resolved settings to the config file and exit
    #[arg(long)]
    init_config: bool,

    /// Write into the target directory even if it is not empty
    #[arg(long)]
    force: bool,

    /// Config file to read instead of ./trowel.json
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref(), cli.url, cli.dirname)
        .context("Failed to load settings")?;

    if cli.init_config {
        let path = cli
            .config
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        settings
            .save(&path)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote settings to {}", path.display());
        return Ok(());
    }

    let swagger_api = SwaggerApi::new();
    let project = trowel::run_emit(&swagger_api, &settings, cli.force)
        .await
        .context("Failed to generate client")?;

    info!(
        "Generated {} into {}",
        project.name, settings.dirname
    );

    Ok(())
}
