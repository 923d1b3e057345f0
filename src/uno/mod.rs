//! Minimal client for the UNO remote protocol (URP) spoken by the office's
//! `--accept` socket.

mod connection;
mod error;
mod marshal;
#[cfg(test)]
pub(crate) mod peer;
mod reflection;
mod session;
mod types;
mod url;

pub use error::UrpError;
pub use reflection::{FunctionTable, InterfaceLayout, Member, MemberKind, TypeRegistry};
pub use session::UnoSession;
pub use types::{Oid, TypeClass, UnoType, Value, XINTERFACE};
pub use url::{UnoUrl, UnoUrlError};

pub(crate) use connection::UrpConnection;
