//! Line-preserving SDP document model.
//!
//! Only what the simulcast munging touches is typed: the media type, the
//! direction attributes, `a=ssrc` and `a=ssrc-group`. Everything else is
//! carried verbatim so that `parse` followed by `to_string` reproduces the
//! input (with CRLF line endings).

use thiserror::Error;

mod data;
pub use data::{MediaAttribute, MediaLine, MediaType, Sdp, SdpLine, Session};

mod parser;

/// Errors from parsing SDP.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SdpError {
    /// The input is not line based `<type>=<value>` SDP.
    #[error("SDP parse: {0}")]
    ParseError(String),
}
