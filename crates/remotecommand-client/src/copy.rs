//! Byte pumps between local endpoints and sub-streams

use crate::options::{LocalReader, LocalWriter};
use remotecommand_transport::{SubStream, TransportResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace};

/// Copy the local source into `stream` until EOF or error.
///
/// The stream is half-closed afterwards in both cases so the remote sees the
/// end of its input.
pub(crate) async fn copy_to_remote<S: SubStream>(
    mut source: LocalReader,
    mut stream: S,
    buffer_size: usize,
) -> TransportResult<u64> {
    let mut buf = vec![0u8; buffer_size];
    let mut total = 0u64;

    let result = loop {
        let n = match source.read(&mut buf).await {
            Ok(0) => break Ok(total),
            Ok(n) => n,
            Err(e) => break Err(e.into()),
        };
        if let Err(e) = stream.send_bytes(&buf[..n]).await {
            break Err(e);
        }
        total += n as u64;
        trace!("Copied {} bytes to {} stream", n, stream.stream_type());
    };

    if let Err(e) = stream.finish().await {
        debug!("Failed to finish {} stream: {}", stream.stream_type(), e);
    }
    result
}

/// Copy everything the remote writes on `stream` into the local sink, until
/// the remote closes the stream.
pub(crate) async fn copy_from_remote<S: SubStream>(
    mut stream: S,
    mut sink: LocalWriter,
    buffer_size: usize,
) -> TransportResult<u64> {
    let mut total = 0u64;

    loop {
        let data = stream.recv_bytes(buffer_size).await?;
        if data.is_empty() {
            sink.flush().await?;
            debug!(
                "{} stream closed by remote after {} bytes",
                stream.stream_type(),
                total
            );
            return Ok(total);
        }
        sink.write_all(&data).await?;
        total += data.len() as u64;
        trace!("Copied {} bytes from {} stream", data.len(), stream.stream_type());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remotecommand_proto::StreamType;
    use remotecommand_transport::mock::pipe;
    use remotecommand_transport::TransportError;

    #[tokio::test]
    async fn test_copy_to_remote_finishes_stream() {
        let (stream, mut peer) = pipe(StreamType::Stdin, 1);
        let source: LocalReader = Box::new(&b"echo hello\n"[..]);

        let copied = copy_to_remote(source, stream, 4).await.unwrap();

        assert_eq!(copied, 11);
        assert_eq!(peer.read_to_end().await, b"echo hello\n");
    }

    /// Local source whose reads always fail
    struct BrokenSource;

    impl tokio::io::AsyncRead for BrokenSource {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "terminal went away",
            )))
        }
    }

    #[tokio::test]
    async fn test_copy_to_remote_read_failure_still_finishes() {
        let (stream, mut peer) = pipe(StreamType::Stdin, 1);
        let source: LocalReader = Box::new((&b"partial"[..]).chain(BrokenSource));

        let result = copy_to_remote(source, stream, 64).await;

        assert!(matches!(result, Err(TransportError::IoError(_))));
        // The remote still gets what was read and then end of input
        assert_eq!(peer.read_to_end().await, b"partial");
    }

    #[tokio::test]
    async fn test_copy_to_remote_send_failure() {
        let (stream, peer) = pipe(StreamType::Stdin, 1);
        drop(peer);
        let source: LocalReader = Box::new(&b"data"[..]);

        assert!(copy_to_remote(source, stream, 16).await.is_err());
    }

    #[tokio::test]
    async fn test_copy_from_remote_until_close() {
        let (stream, mut peer) = pipe(StreamType::Stdout, 1);
        assert!(peer.send("line one\n"));
        assert!(peer.send("line two\n"));
        peer.close_write();

        let (writer, mut reader) = tokio::io::duplex(1024);
        let copied = copy_from_remote(stream, Box::new(writer), 8).await.unwrap();
        assert_eq!(copied, 18);

        let mut output = String::new();
        reader.read_to_string(&mut output).await.unwrap();
        assert_eq!(output, "line one\nline two\n");
    }
}
