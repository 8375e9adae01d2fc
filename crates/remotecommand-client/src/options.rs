//! Per-session options: local endpoints, TTY mode and the resize source

use async_trait::async_trait;
use remotecommand_proto::TerminalSize;
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

/// Local source copied to the remote stdin
pub type LocalReader = Box<dyn AsyncRead + Send + Unpin>;

/// Local sink receiving remote stdout or stderr
pub type LocalWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Source of terminal resize events
///
/// `next` may wait indefinitely between events. Returning `None` means no
/// more events will ever arrive.
#[async_trait]
pub trait TerminalSizeQueue: Send {
    async fn next(&mut self) -> Option<TerminalSize>;
}

#[async_trait]
impl TerminalSizeQueue for mpsc::Receiver<TerminalSize> {
    async fn next(&mut self) -> Option<TerminalSize> {
        self.recv().await
    }
}

#[async_trait]
impl TerminalSizeQueue for mpsc::UnboundedReceiver<TerminalSize> {
    async fn next(&mut self) -> Option<TerminalSize> {
        self.recv().await
    }
}

/// Streams and terminal settings for one session
///
/// Any endpoint left unset is not wired to the remote. With `tty` set the
/// remote merges stderr into stdout, so a stderr sink is ignored; without it
/// the resize queue is ignored.
#[derive(Default)]
pub struct StreamOptions {
    pub stdin: Option<LocalReader>,
    pub stdout: Option<LocalWriter>,
    pub stderr: Option<LocalWriter>,
    pub tty: bool,
    pub terminal_size_queue: Option<Box<dyn TerminalSizeQueue>>,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdin(mut self, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.stdin = Some(Box::new(reader));
        self
    }

    pub fn stdout(mut self, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.stdout = Some(Box::new(writer));
        self
    }

    pub fn stderr(mut self, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.stderr = Some(Box::new(writer));
        self
    }

    pub fn tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    pub fn terminal_size_queue(mut self, queue: impl TerminalSizeQueue + 'static) -> Self {
        self.terminal_size_queue = Some(Box::new(queue));
        self
    }
}

impl fmt::Debug for StreamOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamOptions")
            .field("stdin", &self.stdin.is_some())
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .field("tty", &self.tty)
            .field(
                "terminal_size_queue",
                &self.terminal_size_queue.is_some(),
            )
            .finish()
    }
}
