//! Remote command protocol definitions
//!
//! This crate defines the wire vocabulary shared by every generation of the
//! remote command streaming protocol: the sub-stream roles, the negotiated
//! protocol versions, the terminal resize message and the status record
//! carried on the error stream.

pub mod status;
pub mod stream_type;
pub mod terminal;
pub mod version;

pub use status::{
    Status, StatusCause, StatusDetails, StatusOutcome, EXIT_CODE_CAUSE, NON_ZERO_EXIT_CODE_REASON,
};
pub use stream_type::{ParseStreamTypeError, StreamType, STREAM_TYPE_HEADER};
pub use terminal::TerminalSize;
pub use version::{ProtocolVersion, UnknownProtocolError};
