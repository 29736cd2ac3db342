use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::net::{TcpStream, tcp};

#[cfg(unix)]
use tokio::net::{UnixStream, unix};

/// An either `TcpStream` or `UnixStream`, which implement
/// `AsyncRead` and `AsyncWrite` transparently.
pub struct Socket {
    kind: Kind,
}

enum Kind {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Socket {
    pub async fn connect_tcp(host: &str, port: u16) -> io::Result<Socket> {
        let socket = TcpStream::connect((host, port)).await?;
        socket.set_nodelay(true)?;
        Ok(Socket { kind: Kind::Tcp(socket) })
    }

    pub async fn connect_unix(path: &str) -> io::Result<Socket> {
        #[cfg(unix)]
        {
            let socket = UnixStream::connect(path).await?;
            Ok(Socket { kind: Kind::Unix(socket) })
        }

        #[cfg(not(unix))]
        {
            let _ = path;
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix domain sockets are unavailable on this platform",
            ))
        }
    }

    /// Split into an owned read half and an owned write half.
    ///
    /// The receiver task takes the read half exclusively; senders keep the
    /// write half.
    pub fn into_split(self) -> (ReadSocket, WriteSocket) {
        match self.kind {
            Kind::Tcp(tcp) => {
                let (read, write) = tcp.into_split();
                (
                    ReadSocket { kind: ReadKind::Tcp(read) },
                    WriteSocket { kind: WriteKind::Tcp(write) },
                )
            }
            #[cfg(unix)]
            Kind::Unix(unix) => {
                let (read, write) = unix.into_split();
                (
                    ReadSocket { kind: ReadKind::Unix(read) },
                    WriteSocket { kind: WriteKind::Unix(write) },
                )
            }
        }
    }
}

/// Read half of a [`Socket`].
pub struct ReadSocket {
    kind: ReadKind,
}

enum ReadKind {
    Tcp(tcp::OwnedReadHalf),
    #[cfg(unix)]
    Unix(unix::OwnedReadHalf),
}

/// Write half of a [`Socket`].
pub struct WriteSocket {
    kind: WriteKind,
}

enum WriteKind {
    Tcp(tcp::OwnedWriteHalf),
    #[cfg(unix)]
    Unix(unix::OwnedWriteHalf),
}

macro_rules! delegate_read {
    ($ty:ident, $kind:ident) => {
        impl tokio::io::AsyncRead for $ty {
            fn poll_read(
                mut self: Pin<&mut Self>,
                cx: &mut Context<'_>,
                buf: &mut tokio::io::ReadBuf<'_>,
            ) -> Poll<io::Result<()>> {
                match &mut self.kind {
                    $kind::Tcp(t) => Pin::new(t).poll_read(cx, buf),
                    #[cfg(unix)]
                    $kind::Unix(u) => Pin::new(u).poll_read(cx, buf),
                }
            }
        }
    };
}

macro_rules! delegate_write {
    ($ty:ident, $kind:ident) => {
        impl tokio::io::AsyncWrite for $ty {
            fn poll_write(
                mut self: Pin<&mut Self>,
                cx: &mut Context<'_>,
                buf: &[u8],
            ) -> Poll<io::Result<usize>> {
                match &mut self.kind {
                    $kind::Tcp(t) => Pin::new(t).poll_write(cx, buf),
                    #[cfg(unix)]
                    $kind::Unix(u) => Pin::new(u).poll_write(cx, buf),
                }
            }

            fn poll_flush(
                mut self: Pin<&mut Self>,
                cx: &mut Context<'_>,
            ) -> Poll<io::Result<()>> {
                match &mut self.kind {
                    $kind::Tcp(t) => Pin::new(t).poll_flush(cx),
                    #[cfg(unix)]
                    $kind::Unix(u) => Pin::new(u).poll_flush(cx),
                }
            }

            fn poll_shutdown(
                mut self: Pin<&mut Self>,
                cx: &mut Context<'_>,
            ) -> Poll<io::Result<()>> {
                match &mut self.kind {
                    $kind::Tcp(t) => Pin::new(t).poll_shutdown(cx),
                    #[cfg(unix)]
                    $kind::Unix(u) => Pin::new(u).poll_shutdown(cx),
                }
            }
        }
    };
}

delegate_read!(Socket, Kind);
delegate_write!(Socket, Kind);
delegate_read!(ReadSocket, ReadKind);
delegate_write!(WriteSocket, WriteKind);

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            Kind::Tcp(ref tcp) => std::fmt::Debug::fmt(tcp, f),
            #[cfg(unix)]
            Kind::Unix(ref unix) => std::fmt::Debug::fmt(unix, f),
        }
    }
}
