//! Tarih-i Sima development server

use clap::Parser;
use sima_server::{AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sima-server")]
#[command(about = "Tarih-i Sima chat backend (HTTP + socket channel)", long_about = None)]
#[command(version)]
struct Args {
    /// Bind address (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port (overrides PORT)
    #[arg(long, short)]
    port: Option<u16>,

    /// Answer from the scripted generator even if OPENAI_API_KEY is set
    #[arg(long)]
    offline: bool,

    /// Never attach reply audio
    #[arg(long)]
    no_tts: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.offline {
        config.openai_api_key = None;
    }
    if args.no_tts {
        config.enable_tts = false;
    }

    let listener = TcpListener::bind(config.bind_addr()).await?;
    let state = AppState::from_config(config)?;
    sima_server::serve(listener, state).await?;
    Ok(())
}
