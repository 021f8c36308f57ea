//! Connection supervisor (spec.md §4.5): a single-threaded accept loop that
//! spawns one worker thread per connection, plus signal-triggered shutdown
//! of every live socket.

use crate::dispatch::{self, DispatchOutcome};
use crate::registry::ConnectionRegistry;
use crate::session::UserSession;
use crate::store::Stores;
use rv_proto::{greeting, FramedConnection, ProtoError};
use slog::{debug, error, info, o, warn, Logger};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

/// Binds `port`, installs a Ctrl-C/SIGTERM handler that force-closes every
/// live connection, and accepts until the listener itself errors out
/// (normally only once the process is being torn down).
pub fn run(listener: TcpListener, stores: Stores, log: Logger) -> anyhow::Result<()> {
    let stores = Arc::new(stores);
    let registry = Arc::new(ConnectionRegistry::new());

    {
        let registry = Arc::clone(&registry);
        let log = log.clone();
        ctrlc::set_handler(move || {
            info!(log, "shutdown signal received"; "live_connections" => registry.len());
            registry.shutdown_all();
            std::process::exit(0);
        })?;
    }

    info!(log, "listening"; "addr" => %listener.local_addr()?);

    for incoming in listener.incoming() {
        let stream = match incoming {
            Ok(stream) => stream,
            Err(err) => {
                warn!(log, "accept failed"; "error" => %err);
                continue;
            }
        };

        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let worker_log = log.new(o!("peer" => peer));
        let stores = Arc::clone(&stores);
        let registry = Arc::clone(&registry);

        thread::spawn(move || {
            let id = match registry.register(&stream) {
                Ok(id) => id,
                Err(err) => {
                    warn!(worker_log, "failed to register connection"; "error" => %err);
                    return;
                }
            };
            serve_connection(stream, &stores, &worker_log);
            registry.deregister(id);
        });
    }

    Ok(())
}

/// Drives one accepted connection end to end: greeting, then a dispatch
/// loop until `EXIT`, a framing error, or the peer closing the socket.
fn serve_connection(stream: TcpStream, stores: &Stores, log: &Logger) {
    let mut conn = FramedConnection::new(stream);

    if let Err(err) = greeting::greet_as_server(&mut conn) {
        debug!(log, "greeting denied"; "error" => %err);
        return;
    }

    let mut session = UserSession::new();
    loop {
        match dispatch::dispatch_one_request(&mut conn, &mut session, stores, log) {
            Ok(DispatchOutcome::Continue) => continue,
            Ok(DispatchOutcome::Exit) => {
                debug!(log, "connection closed by EXIT"; "user" => session.username().unwrap_or("-"));
                break;
            }
            Err(ProtoError::Socket(err)) if is_clean_close(&err) => {
                debug!(log, "connection closed by peer");
                break;
            }
            Err(err) => {
                error!(log, "framing error, aborting connection"; "error" => %err);
                break;
            }
        }
    }
}

fn is_clean_close(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
    )
}
