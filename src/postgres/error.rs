//! Protocol error
use std::str::Utf8Error;

/// An error when translating buffer from postgres.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unexpected message type `{}`, expected `{}`", .found.escape_ascii(), .expect.escape_ascii())]
    Unexpected { expect: u8, found: u8 },
    #[error("unexpected message type `{}` during {phase}", .found.escape_ascii())]
    UnexpectedPhase { found: u8, phase: &'static str },
    #[error("unknown message type `{}`", .0.escape_ascii())]
    UnknownMessage(u8),
    #[error("unknown authentication method ({0})")]
    UnknownAuth(u32),
    #[error("message truncated")]
    Truncated,
    #[error("invalid length ({0})")]
    InvalidLength(i32),
    #[error("unknown transaction status `{}`", .0.escape_ascii())]
    UnknownTransactionStatus(u8),
    #[error("unknown format code ({0})")]
    UnknownFormat(i16),
    #[error("malformed command tag {0:?}")]
    CommandTag(String),
    #[error("missing `{0}` field in error response")]
    MissingErrorField(char),
    #[error("non utf8 string: {0}")]
    Utf8(#[from] Utf8Error),
}

impl ProtocolError {
    pub(crate) fn unknown(found: u8) -> ProtocolError {
        Self::UnknownMessage(found)
    }

    pub(crate) fn unexpected(expect: u8, found: u8) -> ProtocolError {
        Self::Unexpected { expect, found }
    }

    pub(crate) fn unexpected_phase(found: u8, phase: &'static str) -> ProtocolError {
        Self::UnexpectedPhase { found, phase }
    }

    pub(crate) fn unknown_auth(auth: u32) -> ProtocolError {
        Self::UnknownAuth(auth)
    }

    pub(crate) fn truncated() -> ProtocolError {
        Self::Truncated
    }
}
