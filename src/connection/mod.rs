//! Postgres connection.
mod config;
mod parameters;
mod receiver;
mod startup;

pub use config::{Config, ParseError, TlsMode};
pub use parameters::{ConnectionParameters, ServerVersion};
pub use receiver::DataMessage;

use bytes::BytesMut;
use std::io;
use tokio::{
    io::AsyncWriteExt,
    sync::mpsc::{UnboundedReceiver, unbounded_channel},
    task::JoinHandle,
};

use crate::{
    Error, Result,
    net::WriteSocket,
    postgres::{BackendMessage, FrontendProtocol, backend::BackendKeyData, frontend},
    statement::StatementStorage,
    transport::Transport,
};

/// Postgres Connection.
///
/// Messages sent through the connection are buffered;
/// [`flush`][Connection::flush] writes them out. The server's replies are
/// decoded by a background receiver task and read back here through
/// [`read_data`][Connection::read_data] and
/// [`read_control`][Connection::read_control], see the [`query`][crate::query]
/// module for the request flows built on top of them.
///
/// Callers serialize their own sends; the receiver task is the only reader.
pub struct Connection {
    // write half, the receiver task owns the read half
    socket: WriteSocket,
    write_buf: BytesMut,
    receiver: JoinHandle<()>,

    data: UnboundedReceiver<Result<DataMessage>>,
    control: UnboundedReceiver<BackendMessage>,

    backend_key_data: Option<BackendKeyData>,
    parameters: ConnectionParameters,
    statements: StatementStorage,
}

impl Connection {
    /// Connect and authenticate with `config`.
    pub async fn connect(config: &Config) -> Result<Connection> {
        let mut io = Transport::connect(config).await?;

        // on failure the transport drops here, releasing the socket
        let outcome = startup::startup(config, &mut io)
            .await
            .map_err(|err| err.context("startup failed"))?;

        let (read, decoder, write, write_buf) = io.into_parts();
        let (data_tx, data_rx) = unbounded_channel();
        let (control_tx, control_rx) = unbounded_channel();

        let receiver = receiver::spawn(
            read,
            decoder,
            receiver::Dispatcher::new(data_tx, control_tx),
        );

        Ok(Connection {
            socket: write,
            write_buf,
            receiver,
            data: data_rx,
            control: control_rx,
            backend_key_data: outcome.backend_key_data,
            parameters: outcome.parameters,
            statements: StatementStorage::new(),
        })
    }

    /// Connect and authenticate with configuration from the environment.
    pub async fn connect_env() -> Result<Connection> {
        Self::connect(&Config::from_env()).await
    }

    /// Connect and authenticate with a `postgres://` url.
    pub async fn connect_url(url: &str) -> Result<Connection> {
        Self::connect(&Config::parse(url)?).await
    }

    /// Session parameters reported by the server at startup.
    pub fn parameters(&self) -> &ConnectionParameters {
        &self.parameters
    }

    /// Cancellation key data, if the server sent it.
    pub fn backend_key_data(&self) -> Option<&BackendKeyData> {
        self.backend_key_data.as_ref()
    }

    /// Prepared statement storage of this connection.
    pub fn statements(&mut self) -> &mut StatementStorage {
        &mut self.statements
    }

    /// Buffer a frontend message.
    ///
    /// Call [`flush`][Connection::flush] to actually send it.
    pub fn send<F: FrontendProtocol>(&mut self, message: F) {
        frontend::write(message, &mut self.write_buf);
    }

    /// Write the buffered messages out.
    pub async fn flush(&mut self) -> io::Result<()> {
        self.socket.write_all_buf(&mut self.write_buf).await?;
        self.socket.flush().await
    }

    /// Dequeue the next entry of the data queue.
    ///
    /// Blocks until the receiver finishes an execute (or fails one with the
    /// server's error).
    pub async fn read_data(&mut self) -> Result<DataMessage> {
        match self.data.recv().await {
            Some(entry) => entry,
            None => Err(Error::closed()),
        }
    }

    /// Dequeue the next entry of the control queue.
    ///
    /// The control queue carries `ErrorResponse`, `NoData`,
    /// `ParameterDescription`, `ReadyForQuery` and `RowDescription`; the
    /// receiver routes everything else elsewhere.
    pub async fn read_control(&mut self) -> Result<BackendMessage> {
        match self.control.recv().await {
            Some(message) => Ok(message),
            None => Err(Error::closed()),
        }
    }

    /// Gracefully close the connection.
    pub async fn close(mut self) -> io::Result<()> {
        self.send(frontend::Terminate);
        self.flush().await?;
        self.receiver.abort();
        self.socket.shutdown().await
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // a dropped connection must not leave its receiver task reading
        self.receiver.abort();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("parameters", &self.parameters)
            .field("statements", &self.statements)
            .finish_non_exhaustive()
    }
}
