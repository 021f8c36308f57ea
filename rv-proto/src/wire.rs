//! Framing primitives: length-prefixed strings, fixed-width integers/enums,
//! and length-prefixed file streams, all built over `read_exact`/`write_all`
//! so a primitive either transfers its entire payload or reports a
//! `ProtoError::Socket`.
//!
//! Byte order is explicit little-endian (see SPEC_FULL.md §5.1 / §11.4):
//! the original C source relied on native host layout, which this crate
//! does not attempt to reproduce.

use crate::codes::{CresCode, MethodCode, PresCode};
use crate::error::{ProtoError, ProtoResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::convert::TryFrom;
use std::io::{self, Read, Write};

/// Wraps a byte stream (a `TcpStream` in production, an in-memory
/// `Cursor`/pipe in tests) with the length-prefixed/fixed-width primitives
/// the protocol needs. Generic over the stream type so the state machines
/// in `rversionsd`/`rversions` can be exercised without a real socket.
pub struct FramedConnection<S> {
    stream: S,
}

impl<S> FramedConnection<S> {
    pub fn new(stream: S) -> Self {
        FramedConnection { stream }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Write> FramedConnection<S> {
    /// Sends the caller's bytes verbatim, looping until the whole buffer is
    /// drained (the "opaque buffer" primitive).
    pub fn write_bytes(&mut self, buf: &[u8]) -> ProtoResult<()> {
        self.stream.write_all(buf)?;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> ProtoResult<()> {
        self.stream.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> ProtoResult<()> {
        self.stream.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> ProtoResult<()> {
        self.stream.write_u64::<LittleEndian>(value)?;
        Ok(())
    }

    /// Length-prefixed string: `u64` length followed by the raw bytes.
    /// `max` bounds what the *peer* may legally send back, not what this
    /// side writes — callers writing a string that may itself exceed a
    /// limit should validate before calling this.
    pub fn write_string(&mut self, s: &str) -> ProtoResult<()> {
        self.write_u64(s.len() as u64)?;
        self.write_bytes(s.as_bytes())
    }

    pub fn write_method(&mut self, method: MethodCode) -> ProtoResult<()> {
        self.write_i32(method as i32)
    }

    pub fn write_pres(&mut self, code: PresCode) -> ProtoResult<()> {
        self.write_i32(code as i32)
    }

    pub fn write_cres(&mut self, code: CresCode) -> ProtoResult<()> {
        self.write_i32(code as i32)
    }

    pub fn flush(&mut self) -> ProtoResult<()> {
        self.stream.flush()?;
        Ok(())
    }

    /// Streams exactly `len` bytes from `reader` as a file-stream primitive:
    /// a `u32` content length followed by that many bytes. Refuses files
    /// larger than `u32::MAX` before transferring any bytes.
    pub fn write_file_stream<R: Read>(&mut self, len: u64, reader: &mut R) -> ProtoResult<()> {
        if len > u64::from(u32::MAX) {
            return Err(ProtoError::FileTooBig { len });
        }
        self.write_u32(len as u32)?;
        let mut remaining = len;
        let mut buf = [0u8; 64 * 1024];
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            reader.read_exact(&mut buf[..chunk])?;
            self.write_bytes(&buf[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }
}

impl<S: Read> FramedConnection<S> {
    pub fn read_bytes_exact(&mut self, buf: &mut [u8]) -> ProtoResult<()> {
        self.stream.read_exact(buf)?;
        Ok(())
    }

    pub fn read_i32(&mut self) -> ProtoResult<i32> {
        Ok(self.stream.read_i32::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> ProtoResult<u32> {
        Ok(self.stream.read_u32::<LittleEndian>()?)
    }

    pub fn read_u64(&mut self) -> ProtoResult<u64> {
        Ok(self.stream.read_u64::<LittleEndian>()?)
    }

    /// Reads a length-prefixed string, rejecting with `TooBig` (wire-level
    /// `E2BIG`) if the advertised length exceeds `max` — the receiver never
    /// allocates past the caller-supplied bound.
    pub fn read_string(&mut self, max: usize) -> ProtoResult<String> {
        let len = self.read_u64()? as usize;
        if len > max {
            return Err(ProtoError::TooBig { len, max });
        }
        let mut buf = vec![0u8; len];
        self.read_bytes_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| ProtoError::Socket(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    pub fn read_method(&mut self) -> ProtoResult<MethodCode> {
        MethodCode::try_from(self.read_i32()?)
    }

    pub fn read_pres(&mut self) -> ProtoResult<PresCode> {
        PresCode::try_from(self.read_i32()?)
    }

    pub fn read_cres(&mut self) -> ProtoResult<CresCode> {
        CresCode::try_from(self.read_i32()?)
    }

    /// Reads a file-stream primitive (`u32` length then that many bytes),
    /// copying the payload into `writer` and returning the byte count.
    pub fn read_file_stream<W: Write>(&mut self, writer: &mut W) -> ProtoResult<u64> {
        let len = self.read_u32()? as u64;
        let mut remaining = len;
        let mut buf = [0u8; 64 * 1024];
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            self.read_bytes_exact(&mut buf[..chunk])?;
            writer.write_all(&buf[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn string_roundtrip() {
        let mut buf = Vec::new();
        FramedConnection::new(&mut buf).write_string("notes.txt").unwrap();
        let mut conn = FramedConnection::new(Cursor::new(buf));
        assert_eq!(conn.read_string(4095).unwrap(), "notes.txt");
    }

    #[test]
    fn string_over_limit_rejected() {
        let mut buf = Vec::new();
        FramedConnection::new(&mut buf).write_string("0123456789").unwrap();
        let mut conn = FramedConnection::new(Cursor::new(buf));
        let err = conn.read_string(4).unwrap_err();
        assert!(matches!(err, ProtoError::TooBig { len: 10, max: 4 }));
    }

    #[test]
    fn file_stream_roundtrip() {
        let payload = b"hello\n".to_vec();
        let mut buf = Vec::new();
        FramedConnection::new(&mut buf)
            .write_file_stream(payload.len() as u64, &mut Cursor::new(payload.clone()))
            .unwrap();

        let mut conn = FramedConnection::new(Cursor::new(buf));
        let mut out = Vec::new();
        let n = conn.read_file_stream(&mut out).unwrap();
        assert_eq!(n, payload.len() as u64);
        assert_eq!(out, payload);
    }

    #[test]
    fn method_code_roundtrip() {
        let mut buf = Vec::new();
        FramedConnection::new(&mut buf).write_method(MethodCode::Add).unwrap();
        let mut conn = FramedConnection::new(Cursor::new(buf));
        assert_eq!(conn.read_method().unwrap(), MethodCode::Add);
    }

    #[test]
    fn unknown_method_code_is_an_error() {
        let mut buf = Vec::new();
        FramedConnection::new(&mut buf).write_i32(99).unwrap();
        let mut conn = FramedConnection::new(Cursor::new(buf));
        assert!(conn.read_method().is_err());
    }

    #[test]
    fn short_read_is_socket_error() {
        let mut conn = FramedConnection::new(Cursor::new(vec![0u8; 2]));
        let err = conn.read_i32().unwrap_err();
        assert!(matches!(err, ProtoError::Socket(_)));
    }
}
