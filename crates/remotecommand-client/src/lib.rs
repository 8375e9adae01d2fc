//! Remote command client library - Public API
//!
//! Runs interactive remote command sessions (exec/attach style) over an
//! upgraded, multiplexed connection: stdin, stdout and stderr are pumped over
//! their own sub-streams while the remote's final status arrives on a
//! separate error stream.
//!
//! ```no_run
//! # async fn run<N: remotecommand_transport::Negotiator>(negotiator: N) -> Result<(), remotecommand_client::SessionError> {
//! use remotecommand_client::{CommandExecutor, ExecutorConfig, StreamExecutor, StreamOptions};
//!
//! let config = ExecutorConfig::builder()
//!     .url("https://cluster.example.com/api/v1/namespaces/default/pods/web/exec?command=sh")
//!     .build()
//!     .map_err(remotecommand_client::SessionError::Config)?;
//! let executor = StreamExecutor::new(negotiator, config)?;
//!
//! let options = StreamOptions::new()
//!     .stdin(tokio::io::stdin())
//!     .stdout(tokio::io::stdout())
//!     .stderr(tokio::io::stderr());
//! executor.stream(options).await
//! # }
//! ```

pub mod config;
mod copy;
pub mod decoder;
pub mod error;
pub mod executor;
pub mod options;
pub mod protocol;
pub mod resize;
pub mod streams;

pub use config::{ExecutorConfig, ExecutorConfigBuilder};
pub use decoder::ErrorDecoder;
pub use error::{RemoteError, SessionError};
pub use executor::{CommandExecutor, StreamExecutor};
pub use options::{LocalReader, LocalWriter, StreamOptions, TerminalSizeQueue};
pub use protocol::{Capabilities, SessionState, StreamProtocolHandler};
pub use resize::pump_resizes;
pub use streams::SubStreams;

pub use remotecommand_proto::{ProtocolVersion, StreamType, TerminalSize};
