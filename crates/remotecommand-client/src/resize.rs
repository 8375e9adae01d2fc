//! Terminal resize pump

use crate::options::TerminalSizeQueue;
use remotecommand_transport::SubStream;
use tracing::{debug, warn};

/// Forward resize events from `queue` to the resize stream.
///
/// Runs until the queue reports that no more events will arrive. A message
/// that cannot be encoded or written is logged and skipped; the pump keeps
/// waiting for the next event. Returns the number of messages written.
pub async fn pump_resizes<Q, S>(queue: &mut Q, stream: &mut S) -> usize
where
    Q: TerminalSizeQueue + ?Sized,
    S: SubStream + ?Sized,
{
    let mut written = 0;

    while let Some(size) = queue.next().await {
        let message = match size.encode() {
            Ok(message) => message,
            Err(e) => {
                warn!("Unable to encode terminal size {:?}: {}", size, e);
                continue;
            }
        };

        match stream.send_bytes(&message).await {
            Ok(()) => {
                written += 1;
                debug!("Sent terminal size {}x{}", size.columns, size.rows);
            }
            Err(e) => warn!("Unable to send terminal size {:?}: {}", size, e),
        }
    }

    debug!("Terminal size queue closed after {} resize messages", written);
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use remotecommand_proto::{StreamType, TerminalSize};
    use remotecommand_transport::mock::pipe;
    use remotecommand_transport::{TransportError, TransportResult};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_pump_writes_each_size_in_order() {
        let (mut stream, mut peer) = pipe(StreamType::Resize, 1);
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(TerminalSize::new(80, 24)).unwrap();
        tx.send(TerminalSize::new(100, 40)).unwrap();
        drop(tx);

        let written = pump_resizes(&mut rx, &mut stream).await;
        assert_eq!(written, 2);

        drop(stream);
        let first = peer.recv().await.unwrap();
        let second = peer.recv().await.unwrap();
        assert_eq!(
            TerminalSize::decode(&first).unwrap(),
            TerminalSize::new(80, 24)
        );
        assert_eq!(
            TerminalSize::decode(&second).unwrap(),
            TerminalSize::new(100, 40)
        );
        assert!(peer.recv().await.is_none());
    }

    /// Resize stream whose second write fails
    #[derive(Debug, Default)]
    struct FlakyStream {
        attempts: usize,
        sent: Vec<Vec<u8>>,
    }

    #[async_trait]
    impl SubStream for FlakyStream {
        async fn send_bytes(&mut self, data: &[u8]) -> TransportResult<()> {
            self.attempts += 1;
            if self.attempts == 2 {
                return Err(TransportError::ConnectionError("flow control".to_string()));
            }
            self.sent.push(data.to_vec());
            Ok(())
        }

        async fn recv_bytes(&mut self, _max_size: usize) -> TransportResult<Bytes> {
            Ok(Bytes::new())
        }

        async fn finish(&mut self) -> TransportResult<()> {
            Ok(())
        }

        async fn close(&mut self) -> TransportResult<()> {
            Ok(())
        }

        fn stream_type(&self) -> StreamType {
            StreamType::Resize
        }

        fn stream_id(&self) -> u64 {
            1
        }

        fn is_closed(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_pump_survives_write_failure() {
        let mut stream = FlakyStream::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        for (cols, rows) in [(80, 24), (120, 30), (100, 40)] {
            tx.send(TerminalSize::new(cols, rows)).unwrap();
        }
        drop(tx);

        let written = pump_resizes(&mut rx, &mut stream).await;

        assert_eq!(written, 2);
        assert_eq!(stream.attempts, 3);
        assert_eq!(
            TerminalSize::decode(&stream.sent[1]).unwrap(),
            TerminalSize::new(100, 40)
        );
    }

    #[tokio::test]
    async fn test_pump_waits_for_events() {
        let (mut stream, mut peer) = pipe(StreamType::Resize, 1);
        let (tx, mut rx) = mpsc::channel(1);

        let pump = tokio::spawn(async move { pump_resizes(&mut rx, &mut stream).await });

        tx.send(TerminalSize::new(132, 43)).await.unwrap();
        let message = peer.recv().await.unwrap();
        assert_eq!(message, Bytes::from_static(b"{\"Width\":132,\"Height\":43}\n"));
        assert!(!pump.is_finished());

        drop(tx);
        assert_eq!(pump.await.unwrap(), 1);
    }
}
