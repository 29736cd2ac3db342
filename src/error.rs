//! `postwire` error types.
use std::{backtrace::Backtrace, fmt, io};

use crate::{
    connection::ParseError,
    postgres::{Diagnostic, ProtocolError},
};

/// A specialized [`Result`] type for `postwire` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from `postwire` library.
pub struct Error {
    context: &'static str,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// The structured error fields, if the server reported this error.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match &self.kind {
            ErrorKind::Database(desc) | ErrorKind::AuthDatabase(desc) => Some(desc),
            _ => None,
        }
    }

    pub(crate) fn database(desc: Diagnostic) -> Error {
        ErrorKind::Database(desc).into()
    }

    pub(crate) fn auth_database(desc: Diagnostic) -> Error {
        ErrorKind::AuthDatabase(desc).into()
    }

    pub(crate) fn unsupported_auth(name: &'static str) -> Error {
        ErrorKind::UnsupportedAuth(name).into()
    }

    pub(crate) fn closed() -> Error {
        ErrorKind::ConnectionClosed.into()
    }

    pub(crate) fn context(mut self, context: &'static str) -> Error {
        self.context = context;
        self
    }
}

/// All possible error kind from `postwire` library.
pub enum ErrorKind {
    /// Configuration could not be parsed.
    Config(ParseError),
    /// The backend byte stream could not be decoded. Fatal to the
    /// connection.
    Protocol(ProtocolError),
    /// The underlying transport failed. Fatal to the connection.
    Io(io::Error),
    /// The server reported an error mid-session. The session continues
    /// until the next `ReadyForQuery`.
    Database(Diagnostic),
    /// The server reported an error during authentication.
    AuthDatabase(Diagnostic),
    /// The server requested an authentication method this library does not
    /// speak.
    UnsupportedAuth(&'static str),
    /// The receiver task is gone and its queues are drained.
    ConnectionClosed,
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = Backtrace::capture();
                Self { context: "", backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<ParseError>e => ErrorKind::Config(e));
from!(<ProtocolError>e => ErrorKind::Protocol(e));
from!(<io::Error>e => ErrorKind::Io(e));

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Protocol(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
            Self::Database(e) => e.fmt(f),
            Self::AuthDatabase(e) => write!(f, "authentication failed: {e}"),
            Self::UnsupportedAuth(name) => {
                write!(f, "`{name}` authentication is not supported")
            }
            Self::ConnectionClosed => f.write_str("connection closed"),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
