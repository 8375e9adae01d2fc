//! In-memory transport for tests
//!
//! [`MockConnection`] hands out [`MockStream`]s backed by channels. The far
//! end of every stream is a [`MockPeer`], which a test drives to play the
//! remote side: script what the remote sends, read what the client wrote,
//! close the remote's sending half.

use super::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tracing::trace;

/// Client side of an in-memory sub-stream
#[derive(Debug)]
pub struct MockStream {
    id: u64,
    stream_type: StreamType,
    outbound: Option<mpsc::UnboundedSender<Bytes>>,
    inbound: mpsc::UnboundedReceiver<Bytes>,
    pending: Bytes,
    closed: bool,
}

/// Remote side of an in-memory sub-stream
#[derive(Debug)]
pub struct MockPeer {
    stream_type: StreamType,
    to_client: Option<mpsc::UnboundedSender<Bytes>>,
    from_client: mpsc::UnboundedReceiver<Bytes>,
}

/// Create a connected stream/peer pair
pub fn pipe(stream_type: StreamType, id: u64) -> (MockStream, MockPeer) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();

    let stream = MockStream {
        id,
        stream_type,
        outbound: Some(outbound),
        inbound,
        pending: Bytes::new(),
        closed: false,
    };
    let peer = MockPeer {
        stream_type,
        to_client: Some(to_client),
        from_client,
    };
    (stream, peer)
}

#[async_trait]
impl SubStream for MockStream {
    async fn send_bytes(&mut self, data: &[u8]) -> TransportResult<()> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::StreamClosed)?;
        outbound
            .send(Bytes::copy_from_slice(data))
            .map_err(|_| TransportError::StreamClosed)
    }

    async fn recv_bytes(&mut self, max_size: usize) -> TransportResult<Bytes> {
        if self.pending.is_empty() {
            match self.inbound.recv().await {
                Some(data) => self.pending = data,
                None => return Ok(Bytes::new()),
            }
        }

        let take = self.pending.len().min(max_size);
        Ok(self.pending.split_to(take))
    }

    async fn finish(&mut self) -> TransportResult<()> {
        self.outbound = None;
        Ok(())
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.outbound = None;
        self.inbound.close();
        self.pending = Bytes::new();
        self.closed = true;
        Ok(())
    }

    fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    fn stream_id(&self) -> u64 {
        self.id
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl MockPeer {
    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    /// Send bytes to the client. Returns false once the client side is gone
    /// or the sending half was closed.
    pub fn send(&self, data: impl Into<Bytes>) -> bool {
        match &self.to_client {
            Some(tx) => tx.send(data.into()).is_ok(),
            None => false,
        }
    }

    /// Close the remote's sending half; the client reads end-of-stream
    pub fn close_write(&mut self) {
        self.to_client = None;
    }

    /// Next chunk written by the client, `None` once it finished or closed
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.from_client.recv().await
    }

    /// Everything the client writes until it finishes the stream
    pub async fn read_to_end(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.from_client.recv().await {
            buf.extend_from_slice(&chunk);
        }
        buf
    }
}

#[derive(Debug, Default)]
struct Inner {
    responses: Mutex<HashMap<StreamType, Bytes>>,
    failures: Mutex<HashSet<StreamType>>,
    created: Mutex<Vec<StreamType>>,
    peers: Mutex<HashMap<StreamType, MockPeer>>,
    stream_created: Notify,
    next_stream_id: AtomicU64,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

/// In-memory connection
///
/// Clones share state, so a test can keep one handle while the code under
/// test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    inner: Arc<Inner>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the remote to send `data` on the stream of this role and then
    /// close its sending half as soon as the stream is created.
    pub fn respond(self, stream_type: StreamType, data: impl Into<Bytes>) -> Self {
        self.inner
            .responses
            .lock()
            .unwrap()
            .insert(stream_type, data.into());
        self
    }

    /// Make creation of the stream of this role fail
    pub fn fail_stream(self, stream_type: StreamType) -> Self {
        self.inner.failures.lock().unwrap().insert(stream_type);
        self
    }

    /// Roles of the streams created so far, in creation order
    pub fn created_streams(&self) -> Vec<StreamType> {
        self.inner.created.lock().unwrap().clone()
    }

    /// Take the remote end of the stream with this role, waiting for the
    /// client to create it.
    ///
    /// Peers that are never taken stay attached to the connection until it
    /// is closed.
    pub async fn peer(&self, stream_type: StreamType) -> MockPeer {
        loop {
            let notified = self.inner.stream_created.notified();
            let peer = self.inner.peers.lock().unwrap().remove(&stream_type);
            if let Some(peer) = peer {
                return peer;
            }
            notified.await;
        }
    }

    /// Number of times `close` was called
    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamCreator for MockConnection {
    type Stream = MockStream;

    async fn create_stream(&self, headers: HeaderMap) -> TransportResult<Self::Stream> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionError(
                "connection closed".to_string(),
            ));
        }

        let stream_type = requested_stream_type(&headers).ok_or_else(|| {
            TransportError::ProtocolError("missing or invalid stream type header".to_string())
        })?;

        if self.inner.failures.lock().unwrap().contains(&stream_type) {
            return Err(TransportError::ConnectionError(format!(
                "refused {} stream",
                stream_type
            )));
        }

        let id = self.inner.next_stream_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (stream, mut peer) = pipe(stream_type, id);

        if let Some(data) = self.inner.responses.lock().unwrap().remove(&stream_type) {
            if !data.is_empty() {
                peer.send(data);
            }
            peer.close_write();
        }

        trace!("Created mock {} stream {}", stream_type, id);
        self.inner.created.lock().unwrap().push(stream_type);
        self.inner.peers.lock().unwrap().insert(stream_type, peer);
        self.inner.stream_created.notify_waiters();

        Ok(stream)
    }
}

#[async_trait]
impl StreamConnection for MockConnection {
    async fn close(&self) {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping the untaken peers ends every stream the test is not driving
        self.inner.peers.lock().unwrap().clear();
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn connection_id(&self) -> String {
        format!("mock-{:p}", Arc::as_ptr(&self.inner))
    }
}

/// Negotiator that hands out a prepared connection
#[derive(Debug, Clone)]
pub struct MockNegotiator {
    connection: MockConnection,
    protocol: Option<String>,
    offered: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockNegotiator {
    /// Negotiates `protocol` (empty for a server without negotiation support)
    pub fn new(connection: MockConnection, protocol: impl Into<String>) -> Self {
        Self {
            connection,
            protocol: Some(protocol.into()),
            offered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Picks the first offered protocol, like a server supporting every
    /// version
    pub fn first_offered(connection: MockConnection) -> Self {
        Self {
            connection,
            protocol: None,
            offered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Protocol lists offered in each negotiation so far
    pub fn offered(&self) -> Vec<Vec<String>> {
        self.offered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Negotiator for MockNegotiator {
    type Connection = MockConnection;

    async fn negotiate(
        &self,
        _request: http::Request<()>,
        protocols: &[String],
    ) -> TransportResult<Negotiated<Self::Connection>> {
        self.offered.lock().unwrap().push(protocols.to_vec());

        let protocol = match &self.protocol {
            Some(protocol) => protocol.clone(),
            None => protocols.first().cloned().unwrap_or_default(),
        };
        Ok(Negotiated {
            connection: self.connection.clone(),
            protocol,
        })
    }
}

/// Negotiator for a server that accepts none of the offered protocols
#[derive(Debug, Clone, Default)]
pub struct RejectingNegotiator;

#[async_trait]
impl Negotiator for RejectingNegotiator {
    type Connection = MockConnection;

    async fn negotiate(
        &self,
        _request: http::Request<()>,
        protocols: &[String],
    ) -> TransportResult<Negotiated<Self::Connection>> {
        Err(TransportError::NegotiationFailed(format!(
            "server supports none of {:?}",
            protocols
        )))
    }
}
