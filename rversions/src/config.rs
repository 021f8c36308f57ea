use clap::Parser;

/// `rversions <ip> <port>` — connects to a running `rversionsd` and drops
/// into an interactive REPL.
#[derive(Debug, Parser)]
#[command(name = "rversions", version, about = "Content-addressed remote file-versioning client")]
pub struct Cli {
    /// Server address to connect to.
    pub ip: String,

    /// Server TCP port.
    pub port: u16,
}
