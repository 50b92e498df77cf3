pub mod logger;
pub mod shutdown;

use anyhow::Result;
use clap::Parser;

use crate::cmd::Args;
use shutdown::GracefulShutdown;

/// Parses CLI args and brings up logging, mirroring
/// `crates/httproxy/src/init/cmd.rs`'s `init()` shape.
pub fn cmd() -> Result<Args> {
    let args = Args::parse();
    logger::init(&args.log_level, args.colored)?;
    log::debug!("{args:?}");
    Ok(args)
}

pub fn shutdown() -> Result<GracefulShutdown> {
    let shutdown = GracefulShutdown::new();
    shutdown::install(shutdown.clone())?;
    Ok(shutdown)
}
