use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use specdraft_config::ConfigLoader;
use specdraft_engine::{DraftService, PromptStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "specdraft", version, about = "Streaming spec-document drafting service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway.
    Serve {
        /// Bind address, overriding SPECDRAFT_HOST.
        #[arg(long)]
        host: Option<String>,
        /// Bind port, overriding SPECDRAFT_PORT.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate configuration and prompt templates, then exit.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::from_env();

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }

            let prompts = Arc::new(
                PromptStore::load(&config.templates).context("failed to load prompt templates")?,
            );
            let service = DraftService::new(&config, prompts)
                .context("failed to construct the drafting service")?;

            info!(
                model = %config.provider.model,
                vision_model = %config.provider.vision_model,
                "starting specdraft gateway"
            );
            specdraft_gateway::serve(&config, Arc::new(service))
                .await
                .context("gateway exited with an error")?;
        }
        Command::Check => {
            PromptStore::load(&config.templates).context("failed to load prompt templates")?;
            if config.provider.api_key.is_none() {
                anyhow::bail!("DASHSCOPE_API_KEY is not set");
            }
            println!("configuration ok");
        }
    }

    Ok(())
}
