//! The set of sub-streams opened for one session

use crate::error::SessionError;
use remotecommand_proto::StreamType;
use remotecommand_transport::{stream_headers, StreamCreator, SubStream};
use tracing::{debug, trace, warn};

/// Sub-streams opened for a session, by role
///
/// Built once by the protocol handler; afterwards each stream is moved into
/// the single task that uses it.
#[derive(Debug)]
pub struct SubStreams<S> {
    pub stdin: Option<S>,
    pub stdout: Option<S>,
    pub stderr: Option<S>,
    pub error: Option<S>,
    pub resize: Option<S>,
}

impl<S> Default for SubStreams<S> {
    fn default() -> Self {
        Self {
            stdin: None,
            stdout: None,
            stderr: None,
            error: None,
            resize: None,
        }
    }
}

impl<S: SubStream> SubStreams<S> {
    /// Roles of the streams currently held, in creation order
    pub fn opened(&self) -> Vec<StreamType> {
        [
            (StreamType::Stdin, &self.stdin),
            (StreamType::Stdout, &self.stdout),
            (StreamType::Stderr, &self.stderr),
            (StreamType::Error, &self.error),
            (StreamType::Resize, &self.resize),
        ]
        .into_iter()
        .filter(|(_, stream)| stream.is_some())
        .map(|(ty, _)| ty)
        .collect()
    }

    fn slot(&mut self, stream_type: StreamType) -> &mut Option<S> {
        match stream_type {
            StreamType::Stdin => &mut self.stdin,
            StreamType::Stdout => &mut self.stdout,
            StreamType::Stderr => &mut self.stderr,
            StreamType::Error => &mut self.error,
            StreamType::Resize => &mut self.resize,
        }
    }

    /// Close every stream still held
    pub async fn close_all(&mut self) {
        for ty in StreamType::ALL {
            if let Some(mut stream) = self.slot(ty).take() {
                if let Err(e) = stream.close().await {
                    warn!("Failed to close {} stream: {}", ty, e);
                }
            }
        }
    }
}

/// Open one stream per role in `roles`, in order.
///
/// On the first failure the streams opened so far are closed and the
/// failure is returned; no stream outlives a failed call.
pub(crate) async fn open_streams<C: StreamCreator>(
    creator: &C,
    roles: &[StreamType],
) -> Result<SubStreams<C::Stream>, SessionError> {
    let mut streams = SubStreams::default();

    for &ty in roles {
        let headers = stream_headers(ty);
        trace!("Requesting {} stream with headers {:?}", ty, headers);

        match creator.create_stream(headers).await {
            Ok(stream) => {
                debug!("Created {} stream {}", ty, stream.stream_id());
                *streams.slot(ty) = Some(stream);
            }
            Err(source) => {
                debug!("Error creating {} stream: {}", ty, source);
                streams.close_all().await;
                return Err(SessionError::StreamCreation { stream: ty, source });
            }
        }
    }

    Ok(streams)
}
