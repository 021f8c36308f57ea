//! Wire protocol shared by `rversionsd` and `rversions`: framing
//! primitives, method/response codes, the greeting handshake, and the
//! field-width limits both sides agree on.

pub mod codes;
pub mod error;
pub mod greeting;
pub mod limits;
pub mod wire;

pub use codes::{CresCode, MethodCode, PresCode};
pub use error::{ProtoError, ProtoResult};
pub use wire::FramedConnection;
