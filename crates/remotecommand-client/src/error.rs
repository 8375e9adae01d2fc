//! Session errors

use remotecommand_proto::StreamType;
use remotecommand_transport::TransportError;
use std::fmt;
use thiserror::Error;

/// Failure reported by the remote side on the error stream
///
/// This is the normal way a non-zero exit of the remote command reaches the
/// caller, so every field is kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RemoteError {
    /// Machine-readable reason (structured status only)
    pub reason: Option<String>,
    pub message: String,
    pub exit_code: Option<i32>,
}

impl RemoteError {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            reason: None,
            message: message.into(),
            exit_code: None,
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.exit_code, self.message.is_empty()) {
            (Some(code), true) => write!(f, "command terminated with exit code {}", code),
            (Some(code), false) => write!(
                f,
                "command terminated with exit code {}: {}",
                code, self.message
            ),
            (None, _) => write!(f, "error executing remote command: {}", self.message),
        }
    }
}

/// Errors produced by a remote command session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid executor configuration: {0}")]
    Config(String),

    #[error("Error creating request: {0}")]
    Request(String),

    #[error("Protocol negotiation failed: {0}")]
    Negotiation(#[source] TransportError),

    /// The negotiator selected a protocol that was never offered
    #[error("Unsupported stream protocol: {0:?}")]
    UnsupportedProtocol(String),

    #[error("Error creating {stream} stream: {source}")]
    StreamCreation {
        stream: StreamType,
        #[source]
        source: TransportError,
    },

    #[error("Error copying {stream} stream: {source}")]
    Copy {
        stream: StreamType,
        #[source]
        source: TransportError,
    },

    #[error("Error reading from error stream: {0}")]
    ErrorStream(#[source] TransportError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Error stream content that is invalid for the negotiated version
    #[error("Error stream protocol error: {0}")]
    Decode(String),

    #[error("Error stream watcher ended without a result")]
    WatcherLost,
}

impl SessionError {
    /// Exit code of the remote command, when the remote reported one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            SessionError::Remote(remote) => remote.exit_code,
            _ => None,
        }
    }

    /// Whether this failure was reported by the remote side
    pub fn is_remote(&self) -> bool {
        matches!(self, SessionError::Remote(_))
    }
}
