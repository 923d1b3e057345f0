use std::time::Duration;
use thiserror::Error;

/// Failures of the URP client, below the automation boundary
#[derive(Error, Debug)]
pub enum UrpError {
    #[error("I/O error on automation socket: {0}")]
    Io(#[from] std::io::Error),

    #[error("Automation call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed URP message: {0}")]
    Protocol(String),

    #[error("Remote raised {0}")]
    RemoteException(String),

    #[error("Object does not implement {0}")]
    MissingInterface(String),

    #[error("{interface} has no member named {member}")]
    UnknownMember { interface: String, member: String },

    #[error("Unexpected value returned by {0}")]
    UnexpectedValue(String),

    /// Connection state is undefined after a failed call
    #[error("Connection is unusable after an earlier failure")]
    Poisoned,
}

impl UrpError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        UrpError::Protocol(msg.into())
    }
}
