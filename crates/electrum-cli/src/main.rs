//! electrum-cli: talk to an Electrum server over TCP or TLS
//!
//! Usage:
//!   electrum-cli --server electrum.example.org --tls call server.version electrum-cli 1.4
//!   electrum-cli --server 127.0.0.1:50001 raw '{"jsonrpc":"2.0","id":1,"method":"server.ping","params":[]}'
//!   electrum-cli --server 127.0.0.1 interactive < requests.jsonl

mod commands;
mod request;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use electrum_core::constants::DEFAULT_CONNECT_TIMEOUT_MS;
use electrum_network::{TlsConfig, Transport, TransportConfig};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "electrum-cli", version, about = "Electrum JSON-RPC line client")]
struct Cli {
    /// Server address (host or host:port; the conventional port is used when omitted)
    #[arg(long, short, default_value = "127.0.0.1")]
    server: String,

    /// Connect with TLS
    #[arg(long)]
    tls: bool,

    /// Accept any server certificate (self-signed servers)
    #[arg(long, requires = "tls")]
    insecure: bool,

    /// Name to verify the server certificate against
    #[arg(long, requires = "tls")]
    server_name: Option<String>,

    /// Dial + handshake timeout in milliseconds (0 disables)
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Enable verbose logging (every frame is traced)
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one JSON-RPC request and print its response
    Call {
        /// Method name, e.g. server.version
        method: String,

        /// Parameters, parsed as JSON when possible
        params: Vec<String>,

        /// Request id
        #[arg(long, default_value_t = 1)]
        id: u64,
    },

    /// Send raw lines and print one incoming frame per line sent
    Raw {
        #[arg(required = true)]
        lines: Vec<String>,
    },

    /// Forward stdin lines and print every incoming frame
    Interactive,
}

impl Cli {
    fn transport_config(&self) -> Result<TransportConfig> {
        let tls = if self.tls {
            let tls = if self.insecure {
                TlsConfig::insecure()?
            } else {
                TlsConfig::with_webpki_roots()?
            };

            Some(match &self.server_name {
                Some(name) => tls.with_server_name(name.clone()),
                None => tls,
            })
        } else {
            None
        };

        Ok(TransportConfig {
            server_addr: request::with_default_port(&self.server, self.tls),
            connect_timeout: (self.timeout_ms > 0).then_some(Duration::from_millis(self.timeout_ms)),
            nodelay: true,
            tls,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("trace")
        } else {
            EnvFilter::new("warn")
        }
    });

    // stdout carries frames only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.transport_config()?;
    let mut transport = Transport::connect_with(&config)
        .await
        .with_context(|| format!("connecting to {}", config.server_addr))?;

    let mut stdout = std::io::stdout();
    let result = match &cli.command {
        Command::Call { method, params, id } => {
            commands::call(&mut transport, *id, method, params, &mut stdout).await
        }
        Command::Raw { lines } => commands::raw(&mut transport, lines, &mut stdout).await,
        Command::Interactive => {
            let stdin = BufReader::new(tokio::io::stdin());
            commands::interactive(&mut transport, stdin, &mut stdout)
                .await
                .map(|forwarded| info!("Forwarded {} lines", forwarded))
        }
    };

    if let Err(e) = transport.close().await {
        warn!("Error closing transport: {}", e);
    }

    result
}
