use std::io;

/// Errors that can occur while framing or driving the wire protocol.
///
/// Framing errors are always fatal for the connection they occur on; the
/// caller is expected to tear the socket down rather than attempt recovery.
#[derive(thiserror::Error, Debug)]
pub enum ProtoError {
    #[error("socket error: {0}")]
    Socket(#[from] io::Error),

    #[error("string of {len} bytes exceeds the {max}-byte limit for this field")]
    TooBig { len: usize, max: usize },

    #[error("file of {len} bytes exceeds the u32 content-length limit")]
    FileTooBig { len: u64 },

    #[error("unrecognized method code {0}")]
    UnknownMethod(i32),

    #[error("unrecognized response code {0}")]
    UnknownResponse(i32),

    #[error("unrecognized client ack code {0}")]
    UnknownCres(i32),

    #[error("greeting handshake denied by peer")]
    GreetingDenied,
}

pub type ProtoResult<T> = Result<T, ProtoError>;
