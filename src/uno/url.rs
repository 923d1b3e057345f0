use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UnoUrlError {
    #[error("UNO URL must start with 'uno:'")]
    MissingScheme,

    #[error("UNO URL must have connection, protocol and object parts")]
    MissingParts,

    #[error("Unsupported connection type '{0}', only 'socket' is available")]
    UnsupportedConnection(String),

    #[error("Unsupported protocol '{0}', only 'urp' is available")]
    UnsupportedProtocol(String),

    #[error("Connection part is missing '{0}'")]
    MissingParameter(&'static str),

    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    #[error("Object name is empty")]
    EmptyObjectName,
}

/// Locator of the automation endpoint, e.g.
/// `uno:socket,host=127.0.0.1,port=2002;urp;StarOffice.ComponentContext`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnoUrl {
    pub host: String,
    pub port: u16,
    pub object: String,
}

impl UnoUrl {
    /// Value for the office's `--accept=` switch that makes it listen here
    pub fn accept_descriptor(&self) -> String {
        format!("socket,host={},port={};urp;", self.host, self.port)
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromStr for UnoUrl {
    type Err = UnoUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .trim()
            .strip_prefix("uno:")
            .ok_or(UnoUrlError::MissingScheme)?;

        let mut parts = rest.splitn(3, ';');
        let (connection, protocol, object) = match (parts.next(), parts.next(), parts.next()) {
            (Some(c), Some(p), Some(o)) => (c, p, o),
            _ => return Err(UnoUrlError::MissingParts),
        };

        let mut params = connection.split(',');
        let kind = params.next().unwrap_or_default().trim();
        if !kind.eq_ignore_ascii_case("socket") {
            return Err(UnoUrlError::UnsupportedConnection(kind.to_string()));
        }

        let mut host = None;
        let mut port = None;
        for param in params {
            match param.split_once('=') {
                Some((key, value)) if key.trim().eq_ignore_ascii_case("host") => {
                    host = Some(value.trim().to_string())
                }
                Some((key, value)) if key.trim().eq_ignore_ascii_case("port") => {
                    port = Some(
                        value
                            .trim()
                            .parse::<u16>()
                            .map_err(|_| UnoUrlError::InvalidPort(value.to_string()))?,
                    )
                }
                _ => {}
            }
        }

        // protocol parameters such as "urp,Negotiate=0" are ignored
        let protocol_name = protocol.split(',').next().unwrap_or_default().trim();
        if !protocol_name.eq_ignore_ascii_case("urp") {
            return Err(UnoUrlError::UnsupportedProtocol(protocol_name.to_string()));
        }

        let object = object.trim();
        if object.is_empty() {
            return Err(UnoUrlError::EmptyObjectName);
        }

        Ok(UnoUrl {
            host: host.ok_or(UnoUrlError::MissingParameter("host"))?,
            port: port.ok_or(UnoUrlError::MissingParameter("port"))?,
            object: object.to_string(),
        })
    }
}

impl fmt::Display for UnoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uno:{}{}", self.accept_descriptor(), self.object)
    }
}
