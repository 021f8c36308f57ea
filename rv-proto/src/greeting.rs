//! Greeting handshake (spec.md §4.2). The client is the *greeter*: it sends
//! a zero-padded 80-byte `"REMOTE"` and waits for `"VERSIONS"` back. The
//! server is the *greeted*: it only answers `"VERSIONS"` if the 80 bytes it
//! read equal `"REMOTE"`, otherwise it writes `"DENY"` and the caller is
//! expected to close the socket.

use crate::error::{ProtoError, ProtoResult};
use crate::wire::FramedConnection;
use std::io::{Read, Write};

const GREETING_FIELD_LEN: usize = 80;
const GREETER_HELLO: &[u8] = b"REMOTE";
const GREETED_HELLO: &[u8] = b"VERSIONS";
const GREETED_DENY: &[u8] = b"DENY";

fn padded(word: &[u8]) -> [u8; GREETING_FIELD_LEN] {
    let mut field = [0u8; GREETING_FIELD_LEN];
    field[..word.len()].copy_from_slice(word);
    field
}

/// Client side of the handshake: speak first, then expect `"VERSIONS"`.
pub fn greet_as_client<S: Read + Write>(conn: &mut FramedConnection<S>) -> ProtoResult<()> {
    conn.write_bytes(&padded(GREETER_HELLO))?;
    conn.flush()?;

    let mut reply = [0u8; GREETED_HELLO.len()];
    conn.read_bytes_exact(&mut reply)?;
    if reply != GREETED_HELLO {
        return Err(ProtoError::GreetingDenied);
    }
    Ok(())
}

/// Server side of the handshake. Returns `Ok(())` if the peer identified
/// itself correctly; `Err(ProtoError::GreetingDenied)` after having already
/// written `"DENY"` to the peer, in which case the caller should close the
/// connection without a further reply.
pub fn greet_as_server<S: Read + Write>(conn: &mut FramedConnection<S>) -> ProtoResult<()> {
    let mut hello = [0u8; GREETING_FIELD_LEN];
    conn.read_bytes_exact(&mut hello)?;

    if hello != padded(GREETER_HELLO) {
        conn.write_bytes(GREETED_DENY)?;
        conn.flush()?;
        return Err(ProtoError::GreetingDenied);
    }

    conn.write_bytes(GREETED_HELLO)?;
    conn.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A tiny duplex in-memory pipe so both sides of the handshake can be
    /// driven in a single thread without a real socket.
    struct Duplex {
        read: Cursor<Vec<u8>>,
        write: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.read.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.write.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn handshake_succeeds_round_trip() {
        let mut client_out = Vec::new();
        {
            let mut client = FramedConnection::new(&mut client_out);
            client.write_bytes(&padded(GREETER_HELLO)).unwrap();
        }

        let mut server = FramedConnection::new(Duplex {
            read: Cursor::new(client_out),
            write: Vec::new(),
        });
        greet_as_server(&mut server).unwrap();
        assert_eq!(server.get_ref().write, GREETED_HELLO);
    }

    #[test]
    fn handshake_rejects_garbage() {
        let mut server = FramedConnection::new(Duplex {
            read: Cursor::new(vec![b'X'; GREETING_FIELD_LEN]),
            write: Vec::new(),
        });
        let err = greet_as_server(&mut server).unwrap_err();
        assert!(matches!(err, ProtoError::GreetingDenied));
        assert_eq!(server.get_ref().write, GREETED_DENY);
    }
}
