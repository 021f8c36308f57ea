//! Per-method server state machines (ADD/GET/LIST/LOGIN/REGISTER/EXIT) and
//! the universal method-code ack that gates them.

use crate::session::UserSession;
use crate::store::Stores;
use rv_proto::limits::{COMMENT_MAX, CREDENTIAL_FIELD_LEN, FILENAME_MAX, HASH_FIELD_LEN, LIST_FILTER_FIELD_LEN};
use rv_proto::{CresCode, FramedConnection, MethodCode, PresCode, ProtoError, ProtoResult};
use rv_store::{FileVersion, StoreError};
use slog::{debug, info, warn, Logger};
use std::convert::TryFrom;
use std::io::{self, Read, Write};

pub enum DispatchOutcome {
    Continue,
    Exit,
}

/// Reads one method code, gates it on recognition and authentication, and
/// dispatches to the matching per-method handler. Socket/framing errors
/// propagate to the caller, which tears the connection down; everything
/// else is reported in-band as a `PresCode` and the loop continues.
pub fn dispatch_one_request<S: Read + Write>(
    conn: &mut FramedConnection<S>,
    session: &mut UserSession,
    stores: &Stores,
    log: &Logger,
) -> ProtoResult<DispatchOutcome> {
    let raw = conn.read_i32()?;
    let method = match MethodCode::try_from(raw) {
        Ok(method) => method,
        Err(_) => {
            warn!(log, "illegal method code"; "code" => raw);
            conn.write_pres(PresCode::IllegalMethod)?;
            return Ok(DispatchOutcome::Continue);
        }
    };

    if method.requires_auth() && !session.is_authenticated() {
        conn.write_pres(PresCode::Denied)?;
        return Ok(DispatchOutcome::Continue);
    }

    conn.write_pres(PresCode::ServerOk)?;

    match method {
        MethodCode::Exit => Ok(DispatchOutcome::Exit),
        MethodCode::Login => handle_login(conn, session, stores, log),
        MethodCode::Register => handle_register(conn, session, stores, log),
        MethodCode::Add => handle_add(conn, session, stores, log),
        MethodCode::Get => handle_get(conn, session, stores, log),
        MethodCode::List => handle_list(conn, session, stores, log),
    }
}

fn handle_login<S: Read + Write>(
    conn: &mut FramedConnection<S>,
    session: &mut UserSession,
    stores: &Stores,
    log: &Logger,
) -> ProtoResult<DispatchOutcome> {
    let (username, password) = read_credentials(conn)?;

    match stores.users.verify_login(&username, &password) {
        Ok(Some(true)) => {
            info!(log, "login"; "user" => &username, "result" => "ok");
            session.authenticate_as(username);
            conn.write_pres(PresCode::ServerOk)?;
        }
        Ok(Some(false)) => {
            info!(log, "login"; "user" => &username, "result" => "denied");
            conn.write_pres(PresCode::Denied)?;
        }
        Ok(None) => {
            info!(log, "login"; "user" => &username, "result" => "not_found");
            conn.write_pres(PresCode::UserNotFound)?;
        }
        Err(err) => {
            warn!(log, "login store error"; "error" => %err);
            conn.write_pres(PresCode::Error)?;
        }
    }
    Ok(DispatchOutcome::Continue)
}

fn handle_register<S: Read + Write>(
    conn: &mut FramedConnection<S>,
    session: &mut UserSession,
    stores: &Stores,
    log: &Logger,
) -> ProtoResult<DispatchOutcome> {
    let (username, password) = read_credentials(conn)?;

    match stores.users.register(&username, &password) {
        Ok(true) => {
            info!(log, "register"; "user" => &username, "result" => "ok");
            session.authenticate_as(username);
            conn.write_pres(PresCode::ServerOk)?;
        }
        Ok(false) => {
            info!(log, "register"; "user" => &username, "result" => "already_exists");
            conn.write_pres(PresCode::UserAlreadyExists)?;
        }
        Err(err) => {
            warn!(log, "register store error"; "error" => %err);
            conn.write_pres(PresCode::Error)?;
        }
    }
    Ok(DispatchOutcome::Continue)
}

fn read_credentials<S: Read>(conn: &mut FramedConnection<S>) -> ProtoResult<(String, String)> {
    let mut username_field = [0u8; CREDENTIAL_FIELD_LEN];
    let mut password_field = [0u8; CREDENTIAL_FIELD_LEN];
    conn.read_bytes_exact(&mut username_field)?;
    conn.read_bytes_exact(&mut password_field)?;
    Ok((fixed_field_to_string(&username_field), fixed_field_to_string(&password_field)))
}

fn handle_add<S: Read + Write>(
    conn: &mut FramedConnection<S>,
    session: &mut UserSession,
    stores: &Stores,
    log: &Logger,
) -> ProtoResult<DispatchOutcome> {
    let username = session.username().expect("ADD requires auth").to_string();
    let filename = conn.read_string(FILENAME_MAX)?;
    let hash = conn.read_string(HASH_FIELD_LEN)?;
    let comment = conn.read_string(COMMENT_MAX)?;

    let already_present = match stores.ledger.contains(&username, &filename, &hash) {
        Ok(present) => present,
        Err(err) => {
            warn!(log, "ledger lookup failed"; "user" => &username, "error" => %err);
            conn.write_pres(PresCode::Error)?;
            return Ok(DispatchOutcome::Continue);
        }
    };

    if already_present {
        debug!(log, "add: file to date"; "user" => &username, "file" => &filename);
        conn.write_pres(PresCode::FileToDate)?;
        return Ok(DispatchOutcome::Continue);
    }
    conn.write_pres(PresCode::ServerOk)?;

    let len = conn.read_u32()? as u64;
    let (result, network_failed) = {
        let mut body = FileStreamBody::new(conn);
        let result = stores.blobs.put(&hash, &mut body, len);
        (result, body.network_failed)
    };

    match result {
        Ok(()) => {}
        Err(_) if network_failed => {
            return Err(ProtoError::Socket(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection failed mid file-stream",
            )));
        }
        Err(err) => {
            warn!(log, "add: blob write failed"; "user" => &username, "hash" => &hash, "error" => %err);
            conn.write_pres(PresCode::Error)?;
            return Ok(DispatchOutcome::Continue);
        }
    }

    let version = FileVersion::new(filename.clone(), hash.clone(), comment);
    match stores.ledger.append(&username, &version) {
        Ok(()) => {
            info!(log, "add"; "user" => &username, "file" => &filename, "hash" => &hash);
            conn.write_pres(PresCode::ServerOk)?;
        }
        Err(err) => {
            warn!(log, "add: ledger append failed"; "user" => &username, "error" => %err);
            conn.write_pres(PresCode::Error)?;
        }
    }
    Ok(DispatchOutcome::Continue)
}

/// Adapts the remaining bytes of an in-flight `ADD` file-stream into a
/// plain `Read` so they can be handed straight to [`rv_store::BlobStore::put`]
/// instead of duplicating its write/verify/cleanup sequence inline here.
/// Records whether a failure originated on the network side (`conn`) as
/// opposed to inside `put` itself, so the caller can tell a fatal framing
/// failure (spec.md §4.1: "any framing error...aborts the connection")
/// apart from a local I/O failure that the connection should survive.
struct FileStreamBody<'a, S> {
    conn: &'a mut FramedConnection<S>,
    network_failed: bool,
}

impl<'a, S> FileStreamBody<'a, S> {
    fn new(conn: &'a mut FramedConnection<S>) -> Self {
        FileStreamBody { conn, network_failed: false }
    }
}

impl<'a, S: Read> Read for FileStreamBody<'a, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.conn.get_mut().read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.network_failed = true;
                Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed mid file-stream"))
            }
            Ok(n) => Ok(n),
            Err(err) => {
                self.network_failed = true;
                Err(err)
            }
        }
    }
}

fn handle_get<S: Read + Write>(
    conn: &mut FramedConnection<S>,
    session: &mut UserSession,
    stores: &Stores,
    log: &Logger,
) -> ProtoResult<DispatchOutcome> {
    let username = session.username().expect("GET requires auth").to_string();
    let version = conn.read_i32()?;
    let filename = conn.read_string(FILENAME_MAX)?;

    let found = if version <= 0 {
        None
    } else {
        match stores.ledger.nth_version(&username, &filename, version as usize) {
            Ok(found) => found,
            Err(err) => {
                warn!(log, "get: ledger read failed"; "user" => &username, "error" => %err);
                conn.write_pres(PresCode::Error)?;
                return Ok(DispatchOutcome::Continue);
            }
        }
    };

    let Some(record) = found else {
        conn.write_pres(PresCode::FileNotFound)?;
        return Ok(DispatchOutcome::Continue);
    };
    conn.write_pres(PresCode::ServerOk)?;

    let mut hash_field = [0u8; HASH_FIELD_LEN];
    hash_field[..record.hash.len()].copy_from_slice(record.hash.as_bytes());
    conn.write_bytes(&hash_field)?;

    match conn.read_cres()? {
        CresCode::Confirm => match stores.blobs.get(&record.hash) {
            Ok((mut blob, len)) => {
                conn.write_file_stream(len, &mut blob)?;
                debug!(log, "get: streamed blob"; "user" => &username, "file" => &filename, "version" => version);
            }
            Err(StoreError::BlobNotFound(hash)) => {
                warn!(log, "get: blob missing for recorded hash"; "hash" => hash);
            }
            Err(err) => {
                warn!(log, "get: blob open failed"; "error" => %err);
            }
        },
        CresCode::Deny | CresCode::End => {}
    }

    Ok(DispatchOutcome::Continue)
}

fn handle_list<S: Read + Write>(
    conn: &mut FramedConnection<S>,
    session: &mut UserSession,
    stores: &Stores,
    log: &Logger,
) -> ProtoResult<DispatchOutcome> {
    let username = session.username().expect("LIST requires auth").to_string();

    let mut filter_field = [0u8; LIST_FILTER_FIELD_LEN];
    conn.read_bytes_exact(&mut filter_field)?;
    let filter = fixed_field_to_string(&filter_field);

    let records = match stores.ledger.matching(&username, &filter) {
        Ok(records) => records,
        Err(err) => {
            warn!(log, "list: ledger read failed"; "user" => &username, "error" => %err);
            conn.write_i32(0)?;
            return Ok(DispatchOutcome::Continue);
        }
    };

    conn.write_i32(records.len() as i32)?;
    for record in &records {
        conn.write_string(&record.comment)?;
        conn.write_string(&record.filename)?;
        conn.write_string(&record.hash)?;
    }
    Ok(DispatchOutcome::Continue)
}

/// Decodes a NUL-padded fixed-width field into a `String`, stopping at the
/// first NUL byte — used for the `LIST` filename filter and the
/// `{username, password}` credential record, both fixed-width wire fields
/// (unlike the length-prefixed strings used elsewhere).
fn fixed_field_to_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
