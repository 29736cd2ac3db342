//! Buffered postgres transport.
use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::{
    Result,
    connection::{Config, TlsMode},
    net::{ReadSocket, Socket, WriteSocket},
    postgres::{BackendMessage, Decoder, FrontendProtocol, frontend},
};

/// Bytes asked from the socket per read.
pub(crate) const RECV_BUF: usize = 4096;

const DEFAULT_UNIX_DIR: &str = "/var/run/postgresql";

/// Path of the postgres unix domain socket under `dir`.
///
/// An empty `dir` selects the default directory; trailing slashes are
/// trimmed.
pub(crate) fn unix_socket_path(dir: &str, port: u16) -> String {
    let dir = match dir {
        "" => DEFAULT_UNIX_DIR,
        dir => dir.trim_end_matches('/'),
    };
    format!("{dir}/.s.PGSQL.{port}")
}

/// TLS handshake hook.
///
/// Upgrading the stream is not implemented here; `TlsMode::Require`
/// currently hands the socket back unchanged, so a TLS wrapper can slot in
/// later without touching the codec or the receiver.
async fn tls_handshake(socket: Socket, _config: &Config) -> Result<Socket> {
    Ok(socket)
}

/// A buffered stream which can send and receive postgres messages.
///
/// Used whole during the startup phase, then split into the receiver's read
/// half (which keeps the decoder and any bytes the startup reads left over)
/// and the connection's write half.
#[derive(Debug)]
pub(crate) struct Transport {
    socket: Socket,
    decoder: Decoder,
    write_buf: BytesMut,
}

impl Transport {
    /// Open a stream to the configured endpoint.
    ///
    /// A host that is empty or begins with `/` selects a unix domain
    /// socket, anything else is resolved over TCP.
    pub(crate) async fn connect(config: &Config) -> Result<Transport> {
        let host = config.host();
        let socket = match host.is_empty() || host.starts_with('/') {
            true => Socket::connect_unix(&unix_socket_path(host, config.port())).await?,
            false => Socket::connect_tcp(host, config.port()).await?,
        };

        let socket = match config.tls_mode() {
            TlsMode::Require => tls_handshake(socket, config).await?,
            TlsMode::Disable => socket,
        };

        Ok(Transport {
            socket,
            decoder: Decoder::new(),
            write_buf: BytesMut::with_capacity(1024),
        })
    }

    /// Buffer a frontend message.
    ///
    /// Call [`flush`][Transport::flush] to actually send it.
    pub(crate) fn send<F: FrontendProtocol>(&mut self, message: F) {
        frontend::write(message, &mut self.write_buf);
    }

    /// Buffer the startup message.
    pub(crate) fn send_startup(&mut self, startup: frontend::Startup) {
        startup.write(&mut self.write_buf);
    }

    /// Write the buffered messages out.
    pub(crate) async fn flush(&mut self) -> io::Result<()> {
        self.socket.write_all_buf(&mut self.write_buf).await?;
        self.socket.flush().await
    }

    /// Receive the next backend message.
    pub(crate) async fn recv(&mut self) -> Result<BackendMessage> {
        loop {
            if let Some(message) = self.decoder.next()? {
                return Ok(message);
            }
            let read = self.socket.read_buf(self.decoder.buf_mut(RECV_BUF)).await?;
            if read == 0 {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }
        }
    }

    /// Split into the receiver's half and the sender's half.
    pub(crate) fn into_parts(self) -> (ReadSocket, Decoder, WriteSocket, BytesMut) {
        let (read, write) = self.socket.into_split();
        (read, self.decoder, write, self.write_buf)
    }
}

#[cfg(test)]
mod test {
    use super::unix_socket_path;

    #[test]
    fn unix_socket_paths() {
        assert_eq!(unix_socket_path("", 5432), "/var/run/postgresql/.s.PGSQL.5432");
        assert_eq!(unix_socket_path("/tmp/", 5433), "/tmp/.s.PGSQL.5433");
        assert_eq!(unix_socket_path("/run/postgresql", 5432), "/run/postgresql/.s.PGSQL.5432");
    }
}
