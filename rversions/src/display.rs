//! Human-readable `PresCode` text for the REPL (SPEC_FULL.md §6 — the
//! original client prints a message per response code; this is that table).

use rv_proto::PresCode;

pub fn describe(code: PresCode) -> &'static str {
    match code {
        PresCode::ServerOk => "ok",
        PresCode::FileToDate => "file is up to date",
        PresCode::FileOutdated => "file is outdated",
        PresCode::FileNotFound => "file not found",
        PresCode::VersionNotFound => "version not found",
        PresCode::SocketError => "socket error",
        PresCode::IllegalMethod => "illegal method",
        PresCode::Error => "server error",
        PresCode::Denied => "access denied, login first",
        PresCode::UserNotFound => "user not found",
        PresCode::UserAlreadyExists => "user already exists",
    }
}
