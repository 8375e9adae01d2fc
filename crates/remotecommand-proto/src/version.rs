//! Protocol generations and their negotiation identifiers

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Streaming protocol generation
///
/// Each version is a strict capability superset of the previous one, so the
/// derived ordering doubles as a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolVersion {
    /// stdin/stdout/stderr only
    V1,
    /// Adds the error stream with a plain-text message
    V2,
    /// Adds the terminal resize stream
    V3,
    /// Error stream carries a structured status record
    V4,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown stream protocol: {0:?}")]
pub struct UnknownProtocolError(pub String);

impl ProtocolVersion {
    /// Every version, most capable first (the default negotiation order)
    pub const ALL: [ProtocolVersion; 4] = [
        ProtocolVersion::V4,
        ProtocolVersion::V3,
        ProtocolVersion::V2,
        ProtocolVersion::V1,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            ProtocolVersion::V1 => "channel.k8s.io",
            ProtocolVersion::V2 => "v2.channel.k8s.io",
            ProtocolVersion::V3 => "v3.channel.k8s.io",
            ProtocolVersion::V4 => "v4.channel.k8s.io",
        }
    }

    /// Identifiers for the default negotiation order
    pub fn default_identifiers() -> Vec<String> {
        Self::ALL.iter().map(|v| v.identifier().to_string()).collect()
    }

    /// Resolve the identifier returned by negotiation.
    ///
    /// An empty identifier means the server does not understand protocol
    /// negotiation at all and maps to [`ProtocolVersion::V1`].
    pub fn from_negotiated(identifier: &str) -> Result<Self, UnknownProtocolError> {
        if identifier.is_empty() {
            return Ok(ProtocolVersion::V1);
        }
        identifier.parse()
    }

    pub fn has_error_stream(&self) -> bool {
        *self >= ProtocolVersion::V2
    }

    pub fn has_resize_stream(&self) -> bool {
        *self >= ProtocolVersion::V3
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for ProtocolVersion {
    type Err = UnknownProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProtocolVersion::ALL
            .into_iter()
            .find(|v| v.identifier() == s)
            .ok_or_else(|| UnknownProtocolError(s.to_string()))
    }
}
