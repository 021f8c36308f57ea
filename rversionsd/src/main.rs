use clap::Parser;
use rversionsd::config::Cli;
use rversionsd::store::Stores;
use rversionsd::supervisor;
use slog::{info, o};
use std::net::TcpListener;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log = rv_store::logging::init(cli.verbose);

    let stores = Stores::bootstrap(&cli.root)
        .map_err(|err| anyhow::anyhow!("failed to open store at {}: {err}", cli.root.display()))?;

    let listener = TcpListener::bind(("0.0.0.0", cli.port))?;
    let log = log.new(o!("component" => "rversionsd"));
    info!(log, "store ready"; "root" => %cli.root.display());

    supervisor::run(listener, stores, log)
}
