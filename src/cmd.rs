//! Command-line interface (`SPEC_FULL.md` §6.2).
//!
//! Field-per-flag shape modeled on the teacher's `crates/httproxy/src/cmd`,
//! re-expressed with `clap`'s derive API: `sarge` is a local, path-only
//! dependency on the teacher's machine and cannot be fetched by this crate
//! (see `DESIGN.md`).

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "wrrproxy", about = "Latency-adaptive weighted round-robin reverse proxy")]
pub struct Args {
    /// Path to the TOML configuration document.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Overrides `server.port` from the configuration document.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level: off, error, warn, info, debug, trace.
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Colorize level names in stdout log output.
    #[arg(long, default_value_t = false)]
    pub colored: bool,
}
