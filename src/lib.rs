//! Postgres Wire Protocol Driver
//!
//! `postwire` speaks the PostgreSQL frontend/backend protocol (version 3)
//! over a TCP or unix domain stream. It performs startup and authentication,
//! then splits the session in two: callers serialize typed frontend messages
//! onto the write half while a receiver task decodes the backend reply
//! stream and routes it into a data channel (accumulated rows) and a
//! control channel (barriers and describe results).
//!
//! # Examples
//!
//! ```no_run
//! use postwire::{Config, Connection, query};
//!
//! # async fn app() -> postwire::Result<()> {
//! let config = Config::from_env();
//! let mut conn = Connection::connect(&config).await?;
//!
//! query::send_batch_and_sync(&mut conn, &[
//!     query::BatchQuery::new("SELECT 1"),
//! ]).await?;
//!
//! let data = query::read_next_data(&mut conn).await?;
//! assert_eq!(data.rows.len(), 1);
//!
//! query::read_ready_for_query(&mut conn).await?;
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod common;
mod ext;
mod net;

// Protocol
pub mod postgres;

// Component
pub mod statement;
mod transport;

// Operation
pub mod query;

// Connection
pub mod connection;

mod error;

#[doc(inline)]
pub use connection::{Config, Connection, ConnectionParameters, DataMessage, TlsMode};
#[doc(inline)]
pub use postgres::{BackendMessage, CommandResult, PgFormat};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
