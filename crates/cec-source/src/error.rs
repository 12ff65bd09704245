//! Error types for the source device core

use thiserror::Error;

/// Errors that can occur in the source device core
///
/// Nothing here is fatal to the process. Protocol-level refusals travel
/// back over the bus as <Feature Abort>, and action failures reach
/// their requesters through the action waiters; this type covers the
/// remaining local faults.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Frame could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] cec_protocol::ParseError),

    /// The actor's command or response channel closed
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}
