//! bivvid — the bivvi directory daemon.
//!
//! Binds a TCP listener and serves the SSH-authenticated synthetic
//! directory until SIGINT/SIGTERM, then drains in-flight connections.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;

use bivvi_directory::DirectoryServer;

#[derive(Debug, Parser)]
#[command(name = "bivvid", about = "SSH-authenticated synthetic directory server")]
struct Args {
    /// Path to the config file (default: $XDG_CONFIG_HOME/bivvi/config.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IP address to bind to (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides the config file).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(config::default_config_path);
    let config = config::load_config(&config_path)?;

    let host = args.host.unwrap_or(config.listen.host);
    let port = args.port.unwrap_or(config.listen.port);
    let listen_addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("bind directory listener on {listen_addr}"))?;

    if port == 389 {
        tracing::info!("port 389 usually requires elevated privileges; --port 3389 works unprivileged");
    }
    tracing::info!("bind DN: cn=<your-ssh-public-key>,ou=campers,dc=0_1_0,dc=bivvi");
    tracing::info!("bind password: <your-ssh-server-host>:<port>");
    tracing::info!("the SSH server named in the password must be reachable from this host");

    let server = Arc::new(DirectoryServer::new());
    server.serve(listener, shutdown_signal()).await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

/// Wait for ctrl-c (SIGINT) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}, falling back to SIGINT only");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
