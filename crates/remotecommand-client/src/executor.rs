//! Session entry point: negotiate, dispatch, tear down

use crate::config::ExecutorConfig;
use crate::error::SessionError;
use crate::options::StreamOptions;
use crate::protocol::StreamProtocolHandler;
use async_trait::async_trait;
use remotecommand_proto::ProtocolVersion;
use remotecommand_transport::{Negotiated, Negotiator, StreamConnection};
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, Dispatch};

/// Transports the standard shell streams of a remote command
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run one session to completion.
    ///
    /// Every endpoint set in `options` is wired to the remote command. With
    /// `tty` set, stderr is not used: the remote terminal carries both
    /// output streams over stdout.
    async fn stream(&self, options: StreamOptions) -> Result<(), SessionError>;
}

/// Executor running sessions over connections produced by a [`Negotiator`]
pub struct StreamExecutor<N> {
    negotiator: N,
    config: ExecutorConfig,
    logger: Dispatch,
}

impl<N: Negotiator> StreamExecutor<N> {
    pub fn new(negotiator: N, config: ExecutorConfig) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::Config)?;
        Ok(Self {
            negotiator,
            config,
            logger: Dispatch::none(),
        })
    }

    /// Send this executor's logs to `logger`
    ///
    /// Sessions log nothing unless a logger is installed here.
    pub fn with_logger(mut self, logger: impl Into<Dispatch>) -> Self {
        self.logger = logger.into();
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn build_request(&self) -> Result<http::Request<()>, SessionError> {
        http::Request::builder()
            .method(self.config.method.as_str())
            .uri(self.config.url.as_str())
            .body(())
            .map_err(|e| SessionError::Request(e.to_string()))
    }

    /// Map the negotiated identifier to a version we offered
    fn select_version(&self, protocol: &str) -> Result<ProtocolVersion, SessionError> {
        if protocol.is_empty() {
            info!(
                "The server did not negotiate a streaming protocol version. Falling back to {}",
                ProtocolVersion::V1
            );
            return Ok(ProtocolVersion::V1);
        }

        if !self.config.protocols.iter().any(|p| p == protocol) {
            return Err(SessionError::UnsupportedProtocol(protocol.to_string()));
        }
        ProtocolVersion::from_negotiated(protocol)
            .map_err(|e| SessionError::UnsupportedProtocol(e.0))
    }

    async fn run(&self, options: StreamOptions) -> Result<(), SessionError> {
        let request = self.build_request()?;

        let Negotiated {
            connection,
            protocol,
        } = self
            .negotiator
            .negotiate(request, &self.config.protocols)
            .await
            .map_err(SessionError::Negotiation)?;

        let connection_id = connection.connection_id();
        let result = match self.select_version(&protocol) {
            Ok(version) => {
                debug!("[{}] Stream protocol version {}", connection_id, version);
                StreamProtocolHandler::new(version, options)
                    .with_buffer_size(self.config.copy_buffer_size)
                    .stream(&connection)
                    .await
            }
            Err(e) => Err(e),
        };

        debug!("[{}] Closing connection", connection_id);
        connection.close().await;
        result
    }
}

#[async_trait]
impl<N: Negotiator> CommandExecutor for StreamExecutor<N> {
    async fn stream(&self, options: StreamOptions) -> Result<(), SessionError> {
        self.run(options).with_subscriber(self.logger.clone()).await
    }
}

impl<N: std::fmt::Debug> std::fmt::Debug for StreamExecutor<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamExecutor")
            .field("negotiator", &self.negotiator)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remotecommand_transport::mock::{MockConnection, MockNegotiator};

    fn config() -> ExecutorConfig {
        ExecutorConfig::builder()
            .url("https://example.com/exec?command=ls")
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let negotiator = MockNegotiator::first_offered(MockConnection::new());
        let result = StreamExecutor::new(negotiator, ExecutorConfig::default());
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_select_version() {
        let negotiator = MockNegotiator::first_offered(MockConnection::new());
        let executor = StreamExecutor::new(negotiator, config()).unwrap();

        assert_eq!(executor.select_version("").unwrap(), ProtocolVersion::V1);
        assert_eq!(
            executor.select_version("v3.channel.k8s.io").unwrap(),
            ProtocolVersion::V3
        );
        assert!(matches!(
            executor.select_version("v5.channel.k8s.io"),
            Err(SessionError::UnsupportedProtocol(_))
        ));
    }

    #[test]
    fn test_select_version_only_accepts_offered() {
        let negotiator = MockNegotiator::first_offered(MockConnection::new());
        let config = ExecutorConfig::builder()
            .url("https://example.com/attach")
            .protocols([ProtocolVersion::V2, ProtocolVersion::V1])
            .build()
            .unwrap();
        let executor = StreamExecutor::new(negotiator, config).unwrap();

        assert!(matches!(
            executor.select_version("v4.channel.k8s.io"),
            Err(SessionError::UnsupportedProtocol(ref p)) if p == "v4.channel.k8s.io"
        ));
    }

    #[test]
    fn test_build_request() {
        let negotiator = MockNegotiator::first_offered(MockConnection::new());
        let executor = StreamExecutor::new(negotiator, config()).unwrap();

        let request = executor.build_request().unwrap();
        assert_eq!(request.method(), &http::Method::POST);
        assert_eq!(request.uri().path(), "/exec");
        assert_eq!(request.uri().query(), Some("command=ls"));
    }
}
