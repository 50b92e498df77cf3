pub mod cache;
pub mod cmd;
pub mod config;
pub mod error;
pub mod http;
pub mod init;
pub mod node;
pub mod scheduler;
pub mod server;

use anyhow::{Context, Result};

/// Wires CLI parsing, config loading, and the acceptor loop together
/// (`spec.md` §4.1 "Startup sequence").
pub fn run() -> Result<()> {
    let args = init::cmd()?;
    let mut config = config::Config::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;

    if let Some(port) = args.port {
        config.server.port = port;
    }

    let shutdown = init::shutdown()?;
    server::acceptor::serve(config, shutdown)
}
