use clap::Parser;
use std::path::PathBuf;

/// `rversionsd <port>` — runs the version-control daemon.
#[derive(Debug, Parser)]
#[command(name = "rversionsd", version, about = "Content-addressed remote file-versioning daemon")]
pub struct Cli {
    /// TCP port to listen on.
    pub port: u16,

    /// Root directory for the blob store, user store and per-user ledgers.
    #[arg(long, default_value = ".versions")]
    pub root: PathBuf,

    /// Enable debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,
}
