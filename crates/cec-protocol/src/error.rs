//! Error types for CEC frame parsing

use thiserror::Error;

/// Errors that can occur while parsing a CEC frame or extracting
/// parameters from one
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Frame has no header byte
    #[error("empty frame")]
    EmptyFrame,

    /// Frame has a header but no opcode
    ///
    /// Opcode-less frames are polling messages, which belong to the
    /// transport layer and never reach this library.
    #[error("frame carries no opcode")]
    MissingOpcode,

    /// A parameter field extends past the end of the frame
    #[error("message too short: expected {expected} parameter bytes, got {actual}")]
    MissingParams {
        /// Bytes the opcode requires
        expected: usize,
        /// Bytes actually present
        actual: usize,
    },

    /// The message's opcode does not carry the requested field
    #[error("opcode {0:?} has no physical address parameter")]
    NoAddressParam(crate::message::Opcode),
}
