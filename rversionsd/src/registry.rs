//! Live-socket registry: the process-wide set of accepted connections not
//! yet closed, walked at shutdown to force-close everything (spec.md §4.5,
//! §9 "replace [the shared linked list] with a growable indexed collection
//! guarded by one mutex").

use hashbrown::HashMap;
use parking_lot::Mutex;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct ConnectionRegistry {
    sockets: Mutex<HashMap<u64, TcpStream>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> ConnectionRegistry {
        ConnectionRegistry {
            sockets: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers a clone of `stream` under a fresh id. The worker keeps the
    /// original `TcpStream`; the registry's clone is only ever used to
    /// force-shutdown the socket from a different thread.
    pub fn register(&self, stream: &TcpStream) -> std::io::Result<u64> {
        let handle = stream.try_clone()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sockets.lock().insert(id, handle);
        Ok(id)
    }

    pub fn deregister(&self, id: u64) {
        self.sockets.lock().remove(&id);
    }

    /// Shuts every live socket down for both reads and writes, forcing
    /// blocked workers out of their reads, then forgets them.
    pub fn shutdown_all(&self) {
        let mut sockets = self.sockets.lock();
        for (_, stream) in sockets.drain() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    pub fn len(&self) -> usize {
        self.sockets.lock().len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        ConnectionRegistry::new()
    }
}
