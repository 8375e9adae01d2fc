//! Transport abstraction for remote command sessions
//!
//! The session logic never touches a concrete transport. It talks to the
//! traits in this crate, which are implemented by whatever multiplexed
//! connection the caller upgraded (SPDY, HTTP/2, WebSocket channels, ...).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                remotecommand-client                      │
//! │      (executor, protocol handlers, copy tasks)           │
//! └─────────────────────────────────────────────────────────┘
//!                           │
//!                           │ Uses traits
//!                           ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │          remotecommand-transport (this crate)            │
//! │  - Negotiator           - StreamConnection               │
//! │  - StreamCreator        - SubStream                      │
//! └─────────────────────────────────────────────────────────┘
//!                           │
//!                           │ Implemented by
//!                           ↓
//! ┌──────────────────────────────┬──────────────────────────┐
//! │ upgraded multiplexed         │ mock (feature = "mock")  │
//! │ connections                  │                          │
//! └──────────────────────────────┴──────────────────────────┘
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use remotecommand_proto::{StreamType, STREAM_TYPE_HEADER};
use std::fmt::Debug;
use thiserror::Error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// Transport-level errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Stream closed")]
    StreamClosed,

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Negotiation failed: {0}")]
    NegotiationFailed(String),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// One logical byte channel multiplexed over the connection
///
/// Every sub-stream is owned by a single task for its whole life, so the
/// methods take `&mut self`.
#[async_trait]
pub trait SubStream: Send + Sync + Debug {
    /// Write raw bytes to the remote end
    async fn send_bytes(&mut self, data: &[u8]) -> TransportResult<()>;

    /// Receive up to `max_size` bytes
    ///
    /// Returns empty bytes once the remote has closed its sending side.
    async fn recv_bytes(&mut self, max_size: usize) -> TransportResult<Bytes>;

    /// Close the sending side of the stream (half-close)
    async fn finish(&mut self) -> TransportResult<()>;

    /// Close both directions of the stream
    async fn close(&mut self) -> TransportResult<()>;

    /// Role requested when the stream was created
    fn stream_type(&self) -> StreamType;

    /// Get the stream ID (unique within this connection)
    fn stream_id(&self) -> u64;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;
}

/// Opens sub-streams on an established connection
#[async_trait]
pub trait StreamCreator: Send + Sync + Debug {
    /// The stream type created by this connection
    type Stream: SubStream + 'static;

    /// Open a new sub-stream described by `headers`
    ///
    /// The headers carry at least [`STREAM_TYPE_HEADER`].
    async fn create_stream(&self, headers: HeaderMap) -> TransportResult<Self::Stream>;
}

/// A negotiated, multiplexed connection to the remote peer
#[async_trait]
pub trait StreamConnection: StreamCreator {
    /// Close the connection and every stream on it
    ///
    /// Closing an already closed connection does nothing.
    async fn close(&self);

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Get a unique stable identifier for this connection, for logging
    fn connection_id(&self) -> String;
}

/// Outcome of a successful negotiation
#[derive(Debug)]
pub struct Negotiated<C> {
    pub connection: C,
    /// Protocol identifier selected by the server
    ///
    /// Empty when the server did not take part in version negotiation.
    pub protocol: String,
}

/// Upgrades a request into a multiplexed connection
///
/// The upgrade handshake itself lives outside this workspace; this trait is
/// the seam it plugs into.
#[async_trait]
pub trait Negotiator: Send + Sync + Debug {
    /// The connection type produced by the upgrade
    type Connection: StreamConnection;

    /// Upgrade `request`, offering `protocols` (most capable first)
    async fn negotiate(
        &self,
        request: http::Request<()>,
        protocols: &[String],
    ) -> TransportResult<Negotiated<Self::Connection>>;
}

/// Header map requesting a sub-stream with the given role
pub fn stream_headers(stream_type: StreamType) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(STREAM_TYPE_HEADER),
        HeaderValue::from_static(stream_type.as_str()),
    );
    headers
}

/// Role requested by a header map, if present and valid
pub fn requested_stream_type(headers: &HeaderMap) -> Option<StreamType> {
    headers
        .get(STREAM_TYPE_HEADER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
