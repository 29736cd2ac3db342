//! Postgres Frontend and Backend Protocol
//!
//! Docs here mostly quoted from the official postgres documentation.
//!
//! ## Messaging Overview
//!
//! All communication is through a stream of messages. The first byte of a message identifies the message type,
//! and the next four bytes specify the length of the rest of the message (this length count includes itself,
//! but not the message-type byte). The remaining contents of the message are determined by the message type.
//!
//! For historical reasons, the very first message sent by the client (the startup message)
//! has no initial message-type byte.
//!
//! <https://www.postgresql.org/docs/17/protocol-overview.html>

mod pg_format;

pub mod frontend;
pub mod backend;

mod command;
mod decoder;
mod diagnostic;

mod error;

/// A PostgreSQL object identifier.
pub type Oid = u32;

pub use pg_format::PgFormat;

pub use frontend::FrontendProtocol;
pub use backend::{
    BackendMessage, BackendProtocol, FieldDescription, TransactionStatus,
};
pub use command::CommandResult;
pub use decoder::Decoder;
pub use diagnostic::{Diagnostic, Severity};
pub use error::ProtocolError;
