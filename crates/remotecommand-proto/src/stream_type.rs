//! Sub-stream roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Header carrying the role of a sub-stream when it is created.
///
/// Header names are case-insensitive on the wire; the lowercase form is what
/// `http::HeaderName` stores.
pub const STREAM_TYPE_HEADER: &str = "streamtype";

/// Role of a logical sub-stream multiplexed over the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Stdin,
    Stdout,
    Stderr,
    /// Out-of-band status channel (v2 and later)
    Error,
    /// Terminal resize channel (v3 and later, TTY sessions only)
    Resize,
}

impl StreamType {
    pub const ALL: [StreamType; 5] = [
        StreamType::Stdin,
        StreamType::Stdout,
        StreamType::Stderr,
        StreamType::Error,
        StreamType::Resize,
    ];

    /// Value sent in the stream-type header
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Stdin => "stdin",
            StreamType::Stdout => "stdout",
            StreamType::Stderr => "stderr",
            StreamType::Error => "error",
            StreamType::Resize => "resize",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown stream type: {0:?}")]
pub struct ParseStreamTypeError(pub String);

impl FromStr for StreamType {
    type Err = ParseStreamTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StreamType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| ParseStreamTypeError(s.to_string()))
    }
}
