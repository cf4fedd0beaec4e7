// Tarih-i Sima command line

mod console;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use console::InteractiveConsole;
use sima_chat::{HttpTransport, SessionController, SessionOptions, SocketTransport};
use sima_core::{ClientConfig, PersonaCatalog};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sima")]
#[command(about = "Tarih-i Sima - chat with historical figures", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML or JSON)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (the socket URL is derived from it)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// HTTP only
    #[arg(long, global = true)]
    no_socket: bool,

    /// No audio output
    #[arg(long, global = true)]
    mute: bool,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat console
    Chat {
        /// Figure to start with (e.g. ataturk)
        #[arg(long, short)]
        persona: Option<String>,
    },

    /// List the figures the backend offers
    Personas,

    /// Check the backend and socket channel
    Status,

    /// Run the development backend
    Serve {
        #[arg(long, short)]
        port: Option<u16>,

        /// Scripted replies, no OpenAI calls
        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port, offline } => serve(port, offline).await,
        Commands::Chat { ref persona } => {
            let config = load_config(&cli)?;
            let options = SessionOptions {
                use_socket: !cli.no_socket,
                mute: cli.mute,
            };
            let session = SessionController::from_config(&config, options).await?;
            if let Some(id) = persona {
                session.select_persona(id)?;
            } else {
                println!("Bir figür seçin: /persona <id> (/personas)");
            }
            InteractiveConsole::new(session).run().await
        }
        Commands::Personas => {
            let config = load_config(&cli)?;
            personas(&config).await
        }
        Commands::Status => {
            let config = load_config(&cli)?;
            status(&config, !cli.no_socket).await
        }
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(api_url) = &cli.api_url {
        config.socket_url = socket_url_for(api_url)?;
        config.api_url = api_url.trim_end_matches('/').to_string();
    }
    if cli.no_socket {
        config.socket_enabled = false;
    }
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

/// `http://host:port` -> `ws://host:port/ws`
fn socket_url_for(api_url: &str) -> Result<String> {
    let mut url = url::Url::parse(api_url).with_context(|| format!("Invalid API URL: {}", api_url))?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(anyhow!("Unsupported API URL scheme: {}", other)),
    };
    url.set_scheme(scheme).map_err(|_| anyhow!("Cannot derive socket URL from {}", api_url))?;
    url.set_path("/ws");
    Ok(url.to_string())
}

async fn personas(config: &ClientConfig) -> Result<()> {
    let http = HttpTransport::new(&config.api_url, Duration::from_secs(config.request_timeout_secs))?;
    let personas: Vec<_> = match http.figures().await {
        Ok(figures) => figures.into_values().collect(),
        Err(e) => {
            warn!("Backend unreachable ({}), showing built-in figures", e);
            PersonaCatalog::builtin().iter().cloned().collect()
        }
    };

    for persona in personas {
        println!("{:<22} {}", persona.id, persona.name);
        println!("{:<22} {} · {}", "", persona.era, persona.location);
    }
    Ok(())
}

async fn status(config: &ClientConfig, use_socket: bool) -> Result<()> {
    let http = HttpTransport::new(&config.api_url, Duration::from_secs(config.request_timeout_secs))?;
    match http.service_info().await {
        Ok(info) => {
            println!("✅ HTTP   {} ({} v{})", config.api_url, info.message, info.version);
            println!("   Figürler: {}", info.available_figures.join(", "));
        }
        Err(e) => println!("❌ HTTP   {}: {}", config.api_url, e),
    }

    if !(use_socket && config.socket_enabled) {
        println!("-  Socket devre dışı");
        return Ok(());
    }
    let connect_timeout = Duration::from_secs(config.request_timeout_secs.min(10));
    match SocketTransport::connect(&config.socket_url, connect_timeout, Duration::from_secs(config.reply_timeout_secs)).await {
        Ok(socket) => {
            // The greeting may trail the handshake
            let mut model = socket.backend_model();
            for _ in 0..20 {
                if model.is_some() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(25)).await;
                model = socket.backend_model();
            }
            let model = model.unwrap_or_else(|| "?".to_string());
            println!("✅ Socket {} (model: {})", config.socket_url, model);
            socket.close();
        }
        Err(e) => println!("❌ Socket {}: {}", config.socket_url, e),
    }
    Ok(())
}

async fn serve(port: Option<u16>, offline: bool) -> Result<()> {
    let mut config = sima_server::ServerConfig::from_env();
    if let Some(port) = port {
        config.port = port;
    }
    if offline {
        config.openai_api_key = None;
    }
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Cannot bind {}", config.bind_addr()))?;
    println!("🚀 Tarih-i Sima sunucusu: http://{}", listener.local_addr()?);
    let state = sima_server::AppState::from_config(config)?;
    sima_server::serve(listener, state).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_derived_from_api_url() {
        assert_eq!(socket_url_for("http://localhost:5000").unwrap(), "ws://localhost:5000/ws");
        assert_eq!(socket_url_for("https://sima.example.org/").unwrap(), "wss://sima.example.org/ws");
        assert!(socket_url_for("ftp://example.org").is_err());
    }
}
