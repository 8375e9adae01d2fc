//! Error stream decoding
//!
//! Each protocol generation interprets the bytes read from the error stream
//! differently. The decoder only ever sees non-empty content: a stream that
//! closes without writing anything means success under every scheme.

use crate::error::{RemoteError, SessionError};
use remotecommand_proto::{
    Status, StatusOutcome, EXIT_CODE_CAUSE, NON_ZERO_EXIT_CODE_REASON,
};

/// Decoding scheme for the error stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDecoder {
    /// No error stream exists (v1)
    None,
    /// Content is a human-readable failure message (v2, v3)
    PlainText,
    /// Content is a JSON [`Status`] record (v4)
    StructuredStatus,
}

impl ErrorDecoder {
    /// Turn the full content of the closed error stream into the session
    /// outcome.
    pub fn decode(&self, message: &[u8]) -> Result<(), SessionError> {
        if message.is_empty() {
            return Ok(());
        }

        match self {
            ErrorDecoder::None => Ok(()),
            ErrorDecoder::PlainText => Err(RemoteError::message(
                String::from_utf8_lossy(message).into_owned(),
            )
            .into()),
            ErrorDecoder::StructuredStatus => decode_status(message),
        }
    }
}

fn decode_status(message: &[u8]) -> Result<(), SessionError> {
    let status: Status = serde_json::from_slice(message).map_err(|e| {
        SessionError::Decode(format!(
            "{} in {:?}",
            e,
            String::from_utf8_lossy(message)
        ))
    })?;

    match status.status {
        StatusOutcome::Success => Ok(()),
        StatusOutcome::Failure if status.reason == NON_ZERO_EXIT_CODE_REASON => {
            if status.details.is_none() {
                return Err(SessionError::Decode("details must be set".to_string()));
            }
            let cause = status.cause(EXIT_CODE_CAUSE).ok_or_else(|| {
                SessionError::Decode(format!("no {} cause given", EXIT_CODE_CAUSE))
            })?;
            let code = cause.message.parse::<u8>().map_err(|_| {
                SessionError::Decode(format!("invalid exit code value {:?}", cause.message))
            })?;

            Err(RemoteError {
                reason: Some(status.reason),
                message: status.message,
                exit_code: Some(i32::from(code)),
            }
            .into())
        }
        StatusOutcome::Failure => Err(RemoteError {
            reason: (!status.reason.is_empty()).then_some(status.reason),
            message: status.message,
            exit_code: None,
        }
        .into()),
        StatusOutcome::Unknown => Err(SessionError::Decode("unknown error".to_string())),
    }
}
