use crate::error::ProtoError;
use std::convert::TryFrom;

/// Method codes the client sends to open a request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(i32)]
pub enum MethodCode {
    Get = 0,
    Add = 1,
    List = 2,
    Exit = 3,
    Login = 4,
    Register = 5,
}

impl MethodCode {
    pub fn requires_auth(self) -> bool {
        matches!(self, MethodCode::Get | MethodCode::Add | MethodCode::List)
    }
}

impl TryFrom<i32> for MethodCode {
    type Error = ProtoError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => MethodCode::Get,
            1 => MethodCode::Add,
            2 => MethodCode::List,
            3 => MethodCode::Exit,
            4 => MethodCode::Login,
            5 => MethodCode::Register,
            other => return Err(ProtoError::UnknownMethod(other)),
        })
    }
}

/// Server response codes (`PresCode`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(i32)]
pub enum PresCode {
    ServerOk = 0,
    FileToDate = 1,
    FileOutdated = 2,
    FileNotFound = 3,
    VersionNotFound = 4,
    SocketError = 5,
    IllegalMethod = 6,
    Error = 7,
    Denied = 8,
    UserNotFound = 9,
    UserAlreadyExists = 10,
}

impl TryFrom<i32> for PresCode {
    type Error = ProtoError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => PresCode::ServerOk,
            1 => PresCode::FileToDate,
            2 => PresCode::FileOutdated,
            3 => PresCode::FileNotFound,
            4 => PresCode::VersionNotFound,
            5 => PresCode::SocketError,
            6 => PresCode::IllegalMethod,
            7 => PresCode::Error,
            8 => PresCode::Denied,
            9 => PresCode::UserNotFound,
            10 => PresCode::UserAlreadyExists,
            other => return Err(ProtoError::UnknownResponse(other)),
        })
    }
}

/// Client sub-response used for mid-flow acknowledgments (e.g. the `GET`
/// confirm/deny after the client compares hashes).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(i32)]
pub enum CresCode {
    Confirm = 0,
    Deny = 1,
    End = 2,
}

impl TryFrom<i32> for CresCode {
    type Error = ProtoError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => CresCode::Confirm,
            1 => CresCode::Deny,
            2 => CresCode::End,
            other => return Err(ProtoError::UnknownCres(other)),
        })
    }
}
