//! MCP transport server binary.
//!
//! # Commands
//!
//! - `serve` - Start the HTTP transport
//! - `check-config` - Validate and print the effective configuration
//!
//! Configuration is layered: built-in defaults, then the config file, then
//! `MCP_TRANSPORT_*` environment variables, then command-line flags.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use mcp_transport::{Config, Server, VERSION};

#[derive(Parser)]
#[command(name = "mcp-transport")]
#[command(version = VERSION)]
#[command(about = "Session-multiplexing HTTP transport for MCP servers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP transport
    Serve {
        #[command(flatten)]
        overrides: Overrides,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,

        /// Emit logs as JSON lines
        #[arg(long)]
        json_logs: bool,
    },

    /// Validate configuration and print the effective values
    CheckConfig {
        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Flags shared by every command that loads configuration
#[derive(Args)]
struct Overrides {
    /// Config file (default: <config dir>/mcp-transport/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Mount the legacy /sse and /messages endpoints
    #[arg(long)]
    legacy_sse: bool,

    /// Idle timeout per session (ms)
    #[arg(long)]
    session_timeout_ms: Option<u64>,

    /// Heartbeat period (ms)
    #[arg(long)]
    keep_alive_interval_ms: Option<u64>,

    /// Maximum live sessions
    #[arg(long)]
    max_sessions: Option<usize>,
}

impl Overrides {
    fn load(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => Config::load_default().context("loading default config file")?,
        };
        config
            .apply_env()
            .context("applying environment overrides")?;

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.legacy_sse {
            config.server.legacy_sse = true;
        }
        if let Some(v) = self.session_timeout_ms {
            config.session.timeout_ms = v;
        }
        if let Some(v) = self.keep_alive_interval_ms {
            config.session.keep_alive_interval_ms = v;
        }
        if let Some(v) = self.max_sessions {
            config.session.max_count = v;
        }

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            overrides,
            verbose,
            json_logs,
        } => cmd_serve(&overrides, verbose, json_logs),
        Commands::CheckConfig { overrides } => cmd_check_config(&overrides),
    }
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn cmd_serve(overrides: &Overrides, verbose: bool, json_logs: bool) -> anyhow::Result<()> {
    init_logging(verbose, json_logs);

    let config = overrides.load()?;
    let (server_config, session_config) = config.validate().context("invalid configuration")?;

    tracing::info!(
        addr = %server_config.addr,
        legacy_sse = server_config.legacy_sse,
        timeout_ms = config.session.timeout_ms,
        keep_alive_interval_ms = config.session.keep_alive_interval_ms,
        max_sessions = config.session.max_count,
        "starting mcp-transport {}",
        VERSION
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        Server::new(server_config, session_config)
            .run()
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    })
}

fn cmd_check_config(overrides: &Overrides) -> anyhow::Result<()> {
    let config = overrides.load()?;
    config.validate().context("invalid configuration")?;

    println!("{}", toml::to_string_pretty(&config)?);
    eprintln!("configuration ok");
    Ok(())
}
