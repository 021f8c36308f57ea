//! Drives a real `rversionsd` accept loop over a loopback socket and
//! exercises register/login/add/get/list end to end (spec.md §8 scenarios).

use rv_proto::{greeting, FramedConnection, MethodCode, PresCode};
use rversionsd::store::Stores;
use rversionsd::supervisor;
use sha2::{Digest, Sha256};
use slog::Discard;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

fn spawn_server() -> (std::net::SocketAddr, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let stores = Stores::bootstrap(dir.path()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let log = slog::Logger::root(Discard, slog::o!());

    thread::spawn(move || {
        supervisor::run(listener, stores, log).ok();
    });
    // give the accept loop a moment to start listening for the first connect.
    thread::sleep(Duration::from_millis(20));
    (addr, dir)
}

fn connect(addr: std::net::SocketAddr) -> FramedConnection<TcpStream> {
    let stream = TcpStream::connect(addr).unwrap();
    let mut conn = FramedConnection::new(stream);
    greeting::greet_as_client(&mut conn).unwrap();
    conn
}

fn register(conn: &mut FramedConnection<TcpStream>, user: &str, pass: &str) -> PresCode {
    conn.write_method(MethodCode::Register).unwrap();
    conn.flush().unwrap();
    assert_eq!(conn.read_pres().unwrap(), PresCode::ServerOk);

    let mut u = [0u8; 64];
    let mut p = [0u8; 64];
    u[..user.len()].copy_from_slice(user.as_bytes());
    p[..pass.len()].copy_from_slice(pass.as_bytes());
    conn.write_bytes(&u).unwrap();
    conn.write_bytes(&p).unwrap();
    conn.flush().unwrap();
    conn.read_pres().unwrap()
}

fn login(conn: &mut FramedConnection<TcpStream>, user: &str, pass: &str) -> PresCode {
    conn.write_method(MethodCode::Login).unwrap();
    conn.flush().unwrap();
    assert_eq!(conn.read_pres().unwrap(), PresCode::ServerOk);

    let mut u = [0u8; 64];
    let mut p = [0u8; 64];
    u[..user.len()].copy_from_slice(user.as_bytes());
    p[..pass.len()].copy_from_slice(pass.as_bytes());
    conn.write_bytes(&u).unwrap();
    conn.write_bytes(&p).unwrap();
    conn.flush().unwrap();
    conn.read_pres().unwrap()
}

#[test]
fn register_then_login_then_add_then_get_round_trips() {
    let (addr, _dir) = spawn_server();
    let mut conn = connect(addr);

    assert_eq!(register(&mut conn, "alice", "hunter2"), PresCode::ServerOk);

    let content = b"hello\n".to_vec();
    let hash = hex::encode(Sha256::digest(&content));

    conn.write_method(MethodCode::Add).unwrap();
    conn.flush().unwrap();
    assert_eq!(conn.read_pres().unwrap(), PresCode::ServerOk);
    conn.write_string("notes.txt").unwrap();
    conn.write_string(&hash).unwrap();
    conn.write_string("first revision").unwrap();
    conn.flush().unwrap();
    assert_eq!(conn.read_pres().unwrap(), PresCode::ServerOk);
    conn.write_file_stream(content.len() as u64, &mut std::io::Cursor::new(content.clone())).unwrap();
    conn.flush().unwrap();
    assert_eq!(conn.read_pres().unwrap(), PresCode::ServerOk);

    conn.write_method(MethodCode::Get).unwrap();
    conn.flush().unwrap();
    assert_eq!(conn.read_pres().unwrap(), PresCode::ServerOk);
    conn.write_i32(1).unwrap();
    conn.write_string("notes.txt").unwrap();
    conn.flush().unwrap();
    assert_eq!(conn.read_pres().unwrap(), PresCode::ServerOk);

    let mut hash_field = [0u8; 256];
    conn.read_bytes_exact(&mut hash_field).unwrap();
    let end = hash_field.iter().position(|&b| b == 0).unwrap();
    assert_eq!(std::str::from_utf8(&hash_field[..end]).unwrap(), hash);

    conn.write_cres(rv_proto::CresCode::Confirm).unwrap();
    conn.flush().unwrap();
    let mut received = Vec::new();
    conn.read_file_stream(&mut received).unwrap();
    assert_eq!(received, content);

    conn.write_method(MethodCode::Exit).unwrap();
    conn.flush().unwrap();
}

#[test]
fn login_with_wrong_password_is_denied() {
    let (addr, _dir) = spawn_server();
    let mut conn = connect(addr);
    assert_eq!(register(&mut conn, "bob", "correct-horse"), PresCode::ServerOk);
    assert_eq!(login(&mut conn, "bob", "wrong"), PresCode::Denied);
}

#[test]
fn duplicate_registration_is_rejected() {
    let (addr, _dir) = spawn_server();
    let mut conn = connect(addr);
    assert_eq!(register(&mut conn, "carol", "pw"), PresCode::ServerOk);

    let mut conn2 = connect(addr);
    assert_eq!(register(&mut conn2, "carol", "pw2"), PresCode::UserAlreadyExists);
}

#[test]
fn list_requires_authentication() {
    let (addr, _dir) = spawn_server();
    let mut conn = connect(addr);

    conn.write_method(MethodCode::List).unwrap();
    conn.flush().unwrap();
    assert_eq!(conn.read_pres().unwrap(), PresCode::Denied);
}

#[test]
fn unknown_method_code_is_reported_as_illegal() {
    let (addr, _dir) = spawn_server();
    let mut conn = connect(addr);

    conn.write_i32(99).unwrap();
    conn.flush().unwrap();
    assert_eq!(conn.read_pres().unwrap(), PresCode::IllegalMethod);
}
