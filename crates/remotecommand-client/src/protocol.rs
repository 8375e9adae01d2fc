//! Versioned stream protocol handling
//!
//! All four protocol generations run through one handler. What differs
//! between them is captured in [`Capabilities`]: which extra sub-streams the
//! version opens and how it decodes the error stream. Each version's
//! capabilities are derived from the previous version's, so v3 is exactly
//! v2 plus the resize stream and v4 is exactly v3 with structured status
//! decoding.

use crate::config::DEFAULT_COPY_BUFFER_SIZE;
use crate::copy::{copy_from_remote, copy_to_remote};
use crate::decoder::ErrorDecoder;
use crate::error::SessionError;
use crate::options::{LocalWriter, StreamOptions};
use crate::resize::pump_resizes;
use crate::streams::{open_streams, SubStreams};
use futures::future::OptionFuture;
use remotecommand_proto::{ProtocolVersion, StreamType};
use remotecommand_transport::{StreamCreator, SubStream, TransportError, TransportResult};
use std::fmt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::instrument::WithSubscriber;
use tracing::{debug, trace};

/// What a protocol version adds on top of plain stdin/stdout/stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub error_stream: bool,
    pub resize_stream: bool,
    pub error_decoder: ErrorDecoder,
}

impl Capabilities {
    /// stdin/stdout/stderr only
    pub const BASE: Capabilities = Capabilities {
        error_stream: false,
        resize_stream: false,
        error_decoder: ErrorDecoder::None,
    };

    pub fn for_version(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::V1 => Self::BASE,
            ProtocolVersion::V2 => Self::for_version(ProtocolVersion::V1)
                .with_error_stream(ErrorDecoder::PlainText),
            ProtocolVersion::V3 => Self::for_version(ProtocolVersion::V2).with_resize_stream(),
            ProtocolVersion::V4 => Self::for_version(ProtocolVersion::V3)
                .with_error_stream(ErrorDecoder::StructuredStatus),
        }
    }

    pub fn with_error_stream(self, decoder: ErrorDecoder) -> Self {
        Self {
            error_stream: true,
            error_decoder: decoder,
            ..self
        }
    }

    pub fn with_resize_stream(self) -> Self {
        Self {
            resize_stream: true,
            ..self
        }
    }
}

/// Lifecycle of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    StreamsEstablished,
    Streaming,
    Succeeded,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Created => "created",
            SessionState::StreamsEstablished => "streams-established",
            SessionState::Streaming => "streaming",
            SessionState::Succeeded => "succeeded",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs one session of a negotiated protocol version
pub struct StreamProtocolHandler {
    version: ProtocolVersion,
    capabilities: Capabilities,
    options: StreamOptions,
    buffer_size: usize,
    state: SessionState,
}

impl fmt::Debug for StreamProtocolHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamProtocolHandler")
            .field("version", &self.version)
            .field("options", &self.options)
            .field("state", &self.state)
            .finish()
    }
}

impl StreamProtocolHandler {
    pub fn new(version: ProtocolVersion, options: StreamOptions) -> Self {
        debug!("Initializing protocol {}", version);
        Self {
            version,
            capabilities: Capabilities::for_version(version),
            options,
            buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            state: SessionState::Created,
        }
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, state: SessionState) {
        trace!("Session {} -> {}", self.state, state);
        self.state = state;
    }

    /// Roles this session opens, in order
    pub fn required_streams(&self) -> Vec<StreamType> {
        let options = &self.options;
        let mut roles = Vec::with_capacity(5);

        if options.stdin.is_some() {
            roles.push(StreamType::Stdin);
        }
        if options.stdout.is_some() {
            roles.push(StreamType::Stdout);
        }
        if options.stderr.is_some() && !options.tty {
            roles.push(StreamType::Stderr);
        }
        if self.capabilities.error_stream {
            roles.push(StreamType::Error);
        }
        if self.capabilities.resize_stream && options.tty {
            roles.push(StreamType::Resize);
        }
        roles
    }

    /// Open the sub-streams this version and these options call for
    pub async fn create_streams<C: StreamCreator>(
        &mut self,
        creator: &C,
    ) -> Result<SubStreams<C::Stream>, SessionError> {
        trace!("tty: {}", self.options.tty);
        let result = open_streams(creator, &self.required_streams()).await;
        match result {
            Ok(_) => self.transition(SessionState::StreamsEstablished),
            Err(_) => self.transition(SessionState::Failed),
        }
        result
    }

    /// Run the session to completion and return its single outcome
    pub async fn stream<C: StreamCreator>(mut self, creator: &C) -> Result<(), SessionError> {
        let streams = self.create_streams(creator).await?;
        self.transition(SessionState::Streaming);

        let SubStreams {
            stdin,
            stdout,
            stderr,
            error,
            resize,
        } = streams;
        let options = std::mem::take(&mut self.options);

        let error_rx = watch_error_stream(error, self.capabilities.error_decoder);

        // Without a size source the resize stream stays open, idle, until teardown
        let (resize_pump, idle_resize) = match (resize, options.terminal_size_queue) {
            (Some(mut stream), Some(mut queue)) => {
                debug!("Starting terminal resize pump");
                let pump = tokio::spawn(
                    async move { pump_resizes(&mut *queue, &mut stream).await }
                        .with_current_subscriber(),
                );
                (Some(pump), None)
            }
            (stream, _) => (None, stream),
        };

        // Not joined: the session completes without waiting for stdin EOF
        let stdin_copy = match (stdin, options.stdin) {
            (Some(stream), Some(source)) => {
                let buffer_size = self.buffer_size;
                Some(tokio::spawn(
                    async move {
                        match copy_to_remote(source, stream, buffer_size).await {
                            Ok(total) => debug!("stdin copy finished after {} bytes", total),
                            Err(e) => debug!("stdin copy failed: {}", e),
                        }
                    }
                    .with_current_subscriber(),
                ))
            }
            _ => None,
        };

        let stdout_task = spawn_output_copy(stdout, options.stdout, self.buffer_size);
        let stderr_task = spawn_output_copy(stderr, options.stderr, self.buffer_size);

        let (stdout_result, stderr_result) = tokio::join!(
            join_copy(StreamType::Stdout, stdout_task),
            join_copy(StreamType::Stderr, stderr_task),
        );
        debug!("stdout and stderr copies finished, waiting for error stream");

        let remote_result = error_rx.await.unwrap_or(Err(SessionError::WatcherLost));

        // Nothing started for this session outlives it
        if let Some(pump) = resize_pump {
            pump.abort();
        }
        if let Some(copy) = stdin_copy {
            trace!("Stopping stdin copy");
            copy.abort();
        }
        drop(idle_resize);

        let result = remote_result.and(stdout_result).and(stderr_result);
        self.transition(if result.is_ok() {
            SessionState::Succeeded
        } else {
            SessionState::Failed
        });
        result
    }
}

type CopyTask = JoinHandle<TransportResult<u64>>;

fn spawn_output_copy<S: SubStream + 'static>(
    stream: Option<S>,
    sink: Option<LocalWriter>,
    buffer_size: usize,
) -> Option<CopyTask> {
    let (stream, sink) = (stream?, sink?);
    Some(tokio::spawn(
        copy_from_remote(stream, sink, buffer_size).with_current_subscriber(),
    ))
}

async fn join_copy(stream: StreamType, task: Option<CopyTask>) -> Result<(), SessionError> {
    let Some(joined) = OptionFuture::from(task).await else {
        return Ok(());
    };

    let source = match joined {
        Ok(Ok(_)) => return Ok(()),
        Ok(Err(e)) => e,
        Err(e) => TransportError::IoError(e.into()),
    };
    debug!("{} copy failed: {}", stream, source);
    Err(SessionError::Copy { stream, source })
}

/// Deliver the session's remote outcome on a single-value channel.
///
/// Without an error stream there is nothing to wait for and success is
/// delivered immediately.
fn watch_error_stream<S: SubStream + 'static>(
    stream: Option<S>,
    decoder: ErrorDecoder,
) -> oneshot::Receiver<Result<(), SessionError>> {
    let (tx, rx) = oneshot::channel();

    let Some(mut stream) = stream else {
        let _ = tx.send(Ok(()));
        return rx;
    };

    tokio::spawn(
        async move {
            let result = match read_to_end(&mut stream).await {
                Ok(message) => {
                    trace!("Error stream closed with {} bytes", message.len());
                    decoder.decode(&message)
                }
                Err(e) => Err(SessionError::ErrorStream(e)),
            };
            let _ = tx.send(result);
        }
        .with_current_subscriber(),
    );
    rx
}

async fn read_to_end<S: SubStream>(stream: &mut S) -> TransportResult<Vec<u8>> {
    let mut message = Vec::new();
    loop {
        let chunk = stream.recv_bytes(DEFAULT_COPY_BUFFER_SIZE).await?;
        if chunk.is_empty() {
            return Ok(message);
        }
        message.extend_from_slice(&chunk);
    }
}
