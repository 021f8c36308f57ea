//! Structured logging bootstrap shared by both binaries, mirroring the
//! teacher's `flux::logging::init` — a terminal drain built directly
//! through `sloggers`' builder API rather than a config file, since
//! spec.md §6 rules out environment/config-file plumbing beyond CLI args.

use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

/// Initializes a terminal logger writing to stderr. `debug` raises the
/// level from `Info` to `Debug` (wired to a `-v`/`--verbose` flag on both
/// CLIs).
pub fn init(debug: bool) -> slog::Logger {
    let mut builder = TerminalLoggerBuilder::new();
    builder.level(if debug { Severity::Debug } else { Severity::Info });
    builder.destination(Destination::Stderr);
    builder.build().expect("failed to initialize logger")
}
