//! Client-side drivers for each method's state machine (spec.md §4.4),
//! mirroring the original `clientv.c` step-by-step but over the typed
//! `FramedConnection` primitives instead of raw `read`/`write`.

use anyhow::{bail, Context, Result};
use rv_proto::limits::{COMMENT_MAX, CREDENTIAL_FIELD_LEN, FILENAME_MAX, HASH_FIELD_LEN, LIST_FILTER_FIELD_LEN};
use rv_proto::{CresCode, FramedConnection, MethodCode, PresCode};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;

pub struct ListEntry {
    pub filename: String,
    pub hash: String,
    pub comment: String,
}

fn pad_field(buf: &mut [u8], s: &str) {
    buf.fill(0);
    let n = s.len().min(buf.len());
    buf[..n].copy_from_slice(&s.as_bytes()[..n]);
}

fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Sends the method code and waits for the universal gate ack. `Ok(None)`
/// means the gate replied `RSERVER_OK` and the caller should proceed;
/// `Ok(Some(code))` is a non-OK gate response (denied/illegal method).
fn open_method(conn: &mut FramedConnection<TcpStream>, method: MethodCode) -> Result<Option<PresCode>> {
    conn.write_method(method)?;
    conn.flush()?;
    let ack = conn.read_pres()?;
    Ok(if ack == PresCode::ServerOk { None } else { Some(ack) })
}

pub fn login(conn: &mut FramedConnection<TcpStream>, username: &str, password: &str) -> Result<PresCode> {
    if let Some(code) = open_method(conn, MethodCode::Login)? {
        return Ok(code);
    }
    send_credentials(conn, username, password)?;
    Ok(conn.read_pres()?)
}

pub fn register(conn: &mut FramedConnection<TcpStream>, username: &str, password: &str) -> Result<PresCode> {
    if let Some(code) = open_method(conn, MethodCode::Register)? {
        return Ok(code);
    }
    send_credentials(conn, username, password)?;
    Ok(conn.read_pres()?)
}

fn send_credentials(conn: &mut FramedConnection<TcpStream>, username: &str, password: &str) -> Result<()> {
    let mut username_field = [0u8; CREDENTIAL_FIELD_LEN];
    let mut password_field = [0u8; CREDENTIAL_FIELD_LEN];
    pad_field(&mut username_field, username);
    pad_field(&mut password_field, password);
    conn.write_bytes(&username_field)?;
    conn.write_bytes(&password_field)?;
    conn.flush()?;
    Ok(())
}

pub fn add(conn: &mut FramedConnection<TcpStream>, path: &Path, comment: &str) -> Result<PresCode> {
    if !path.is_file() {
        bail!("{}: no such file", path.display());
    }
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{}: not a valid filename", path.display()))?;
    if filename.len() > FILENAME_MAX {
        bail!("{filename}: filename too long");
    }
    if comment.len() > COMMENT_MAX {
        bail!("comment too long (max {COMMENT_MAX} bytes)");
    }

    if let Some(code) = open_method(conn, MethodCode::Add)? {
        return Ok(code);
    }

    let hash = hash_file(path)?;
    conn.write_string(filename)?;
    conn.write_string(&hash)?;
    conn.write_string(comment)?;
    conn.flush()?;

    let gate = conn.read_pres()?;
    if gate != PresCode::ServerOk {
        return Ok(gate);
    }

    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    conn.write_file_stream(len, &mut file)?;
    conn.flush()?;

    Ok(conn.read_pres()?)
}

pub fn get(conn: &mut FramedConnection<TcpStream>, version: i32, dest: &Path) -> Result<PresCode> {
    let filename = dest
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{}: not a valid filename", dest.display()))?;

    if let Some(code) = open_method(conn, MethodCode::Get)? {
        return Ok(code);
    }

    conn.write_i32(version)?;
    conn.write_string(filename)?;
    conn.flush()?;

    let gate = conn.read_pres()?;
    if gate != PresCode::ServerOk {
        return Ok(gate);
    }

    let mut hash_field = [0u8; HASH_FIELD_LEN];
    conn.read_bytes_exact(&mut hash_field)?;
    let end = hash_field.iter().position(|&b| b == 0).unwrap_or(hash_field.len());
    let server_hash = String::from_utf8_lossy(&hash_field[..end]).into_owned();

    let up_to_date = dest.is_file() && hash_file(dest).map(|h| h == server_hash).unwrap_or(false);
    let cres = if up_to_date { CresCode::Deny } else { CresCode::Confirm };
    conn.write_cres(cres)?;
    conn.flush()?;

    if cres == CresCode::Deny {
        return Ok(PresCode::FileToDate);
    }

    let mut out = File::create(dest).with_context(|| format!("creating {}", dest.display()))?;
    conn.read_file_stream(&mut out)?;
    Ok(PresCode::ServerOk)
}

pub fn list(conn: &mut FramedConnection<TcpStream>, filter: &str) -> Result<Vec<ListEntry>> {
    if let Some(code) = open_method(conn, MethodCode::List)? {
        bail!("list denied: {code:?}");
    }

    let mut filter_field = [0u8; LIST_FILTER_FIELD_LEN];
    pad_field(&mut filter_field, filter);
    conn.write_bytes(&filter_field)?;
    conn.flush()?;

    let count = conn.read_i32()?;
    let mut entries = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let comment = conn.read_string(COMMENT_MAX)?;
        let filename = conn.read_string(FILENAME_MAX)?;
        let hash = conn.read_string(HASH_FIELD_LEN)?;
        entries.push(ListEntry { filename, hash, comment });
    }
    Ok(entries)
}

pub fn exit(conn: &mut FramedConnection<TcpStream>) -> Result<()> {
    conn.write_method(MethodCode::Exit)?;
    conn.flush()?;
    let _ = conn.read_pres()?;
    Ok(())
}
