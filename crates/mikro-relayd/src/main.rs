use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mikro_relay_server::{
    hash::SystemClock,
    mikro::{probe_login, MikroClient},
    ServerConfig, UpstreamConfig,
};
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "mikro-relayd",
    about = "Barcode lookup relay in front of the Mikro ERP SQL API",
    version
)]
struct Cli {
    /// Log level: error, warn, info, debug, verbose (default: $RELAY_LOG_LEVEL or info)
    #[arg(long, global = true, env = "RELAY_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay HTTP server
    Serve {
        /// Port to listen on (default: $RELAY_PORT or 3000)
        #[arg(long, env = "RELAY_PORT", default_value = "3000")]
        port: u16,
        /// Host to bind (default: $RELAY_HOST or 0.0.0.0)
        #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
        host: String,
    },
    /// Run the APILogin check once and exit non-zero if it fails.
    Probe,
    /// Print today's Istanbul date and the derived Mikro password hash.
    Hash,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Values from .env must be visible before clap reads its env fallbacks.
    load_env_file(Path::new(".env"))?;

    let cli = Cli::parse();

    let raw = cli.log_level.clone().unwrap_or_else(|| "info".into());
    let effective_log_level = if raw.eq_ignore_ascii_case("verbose") {
        "debug".to_owned()
    } else {
        raw
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&effective_log_level))
        .init();

    match cli.command {
        Commands::Serve { port, host } => cmd_serve(host, port).await,
        Commands::Probe => cmd_probe().await,
        Commands::Hash => cmd_hash(),
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_serve(host: String, port: u16) -> Result<()> {
    let cfg = ServerConfig {
        host,
        port,
        ..Default::default()
    };

    mikro_relay_server::run(cfg).await
}

async fn cmd_probe() -> Result<()> {
    let client = upstream_client()?;
    if !probe_login(&client).await {
        anyhow::bail!("APILogin probe failed");
    }
    println!("APILogin ok");
    Ok(())
}

fn cmd_hash() -> Result<()> {
    let client = upstream_client()?;
    let hasher = client.hasher();
    if !hasher.has_secret() {
        eprintln!("warning: SIFRE is not set");
    }
    println!("{} {}", hasher.current_date(), hasher.current());
    Ok(())
}

/// Loads `path` into the process env. A missing file is fine; a malformed one is not.
fn load_env_file(path: &Path) -> Result<()> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e).with_context(|| format!("load {}", path.display())),
    }
}

fn upstream_client() -> Result<MikroClient> {
    MikroClient::new(UpstreamConfig::from_env(), Arc::new(SystemClock))
        .context("build Mikro HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env_file(&dir.path().join(".env")).is_ok());
    }

    #[test]
    fn malformed_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "NOT A VALID LINE\n").unwrap();

        let err = load_env_file(&path).unwrap_err();
        assert!(err.to_string().contains(".env"), "{err}");
    }
}
