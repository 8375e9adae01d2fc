//! Structured status record carried on the v4 error stream

use serde::{Deserialize, Serialize};

/// Failure reason used when the remote process exited non-zero
pub const NON_ZERO_EXIT_CODE_REASON: &str = "NonZeroExitCode";

/// Cause type whose message holds the decimal exit code
pub const EXIT_CODE_CAUSE: &str = "ExitCode";

/// Outcome discriminator of a [`Status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusOutcome {
    Success,
    Failure,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Status record written by the remote once the command has finished
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub status: StatusOutcome,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusDetails {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<StatusCause>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCause {
    /// Cause type, e.g. [`EXIT_CODE_CAUSE`]
    #[serde(rename = "reason", skip_serializing_if = "String::is_empty")]
    pub cause_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Status {
    pub fn success() -> Self {
        Self {
            status: StatusOutcome::Success,
            ..Default::default()
        }
    }

    pub fn failure(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: StatusOutcome::Failure,
            reason: reason.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Failure reporting that the remote process exited with `code`
    pub fn exit_code(code: u8, message: impl Into<String>) -> Self {
        Self {
            details: Some(StatusDetails {
                causes: vec![StatusCause {
                    cause_type: EXIT_CODE_CAUSE.to_string(),
                    message: code.to_string(),
                }],
            }),
            ..Self::failure(NON_ZERO_EXIT_CODE_REASON, message)
        }
    }

    /// First cause of the given type, if any
    pub fn cause(&self, cause_type: &str) -> Option<&StatusCause> {
        self.details
            .as_ref()?
            .causes
            .iter()
            .find(|c| c.cause_type == cause_type)
    }
}
