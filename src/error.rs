//! Error taxonomy for daemon, network and controller operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZtError>;

#[derive(Debug, Error)]
pub enum ZtError {
    /// The daemon CLI ran but exited non-zero. `stderr` is passed through verbatim.
    #[error("`{command}` failed: {stderr}")]
    ExternalCommand { command: String, stderr: String },

    #[error("failed to launch {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot connect to local zerotier daemon")]
    DaemonUnreachable {
        #[source]
        source: Option<Box<ZtError>>,
    },

    #[error("no such network: {network_id}")]
    NetworkNotFound { network_id: String },

    #[error("cannot handle assigned address as ipv4: {address}")]
    UnsupportedAddressFamily { address: String },

    #[error("malformed assigned address '{address}': {source}")]
    MalformedAddress {
        address: String,
        #[source]
        source: ipnetwork::IpNetworkError,
    },

    #[error("cancelled while waiting for an address")]
    Cancelled,

    #[error("controller request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Non-2xx controller response. `headers` is already redacted.
    #[error("failed to update member details at {url} (headers: {headers}): {status}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
        headers: String,
        body: String,
    },

    #[error("cannot parse {what} output: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid controller url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid value for {key}: '{value}'")]
    Config { key: &'static str, value: String },
}

impl ZtError {
    pub fn unreachable(cause: ZtError) -> Self {
        ZtError::DaemonUnreachable {
            source: Some(Box::new(cause)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_command_keeps_stderr_verbatim() {
        let err = ZtError::ExternalCommand {
            command: "zerotier-cli -j join abc".to_string(),
            stderr: "400 join { \"error\": \"bad nwid\" }\n".to_string(),
        };
        assert!(err.to_string().contains("400 join { \"error\": \"bad nwid\" }"));
    }

    #[test]
    fn test_unreachable_hides_cause_from_message() {
        let err = ZtError::unreachable(ZtError::ExternalCommand {
            command: "zerotier-cli -j status".to_string(),
            stderr: "permission denied".to_string(),
        });
        assert_eq!(err.to_string(), "cannot connect to local zerotier daemon");
        assert!(std::error::Error::source(&err).is_some());
    }
}
