//! Postgres Frontend Messages
//!
//! All struct fields here mirror the actual message sent to postgres.
use bytes::{BufMut, BytesMut};

use super::{Oid, PgFormat};
use crate::ext::{BufMutExt, StrExt, UsizeExt};

/// write a frontend message to `buf`
pub fn write<F: FrontendProtocol>(msg: F, buf: &mut BytesMut) {
    // msgtype + length
    const PREFIX: usize = 1 + 4;

    let size = msg.size_hint();
    buf.reserve(PREFIX + size as usize);

    let offset = buf.len();
    buf.put_u8(F::MSGTYPE);
    buf.put_i32(4 + size);

    msg.encode(&mut *buf);

    assert_eq!(
        buf.len() - offset,
        PREFIX + size as usize,
        "[BUG] Frontend Message body not equal to size hint"
    );
}

/// A type which can be encoded into postgres frontend message
///
/// For historical reasons, the very first message sent by the client (the startup message)
/// has no initial message-type byte.
///
/// Thus, [`Startup`] does not implement [`FrontendProtocol`]
pub trait FrontendProtocol {
    /// message type
    const MSGTYPE: u8;

    /// size of the main body
    ///
    /// note that this is *only* the size of main body as oppose of actual postgres message
    fn size_hint(&self) -> i32;

    /// write the main body of the message
    ///
    /// writing less or past `size_hint` results in panic
    fn encode(self, buf: impl BufMut);
}

/// Postgres Startup frontend message
///
/// For historical reasons, the very first message sent by the client (the startup message)
/// has no initial message-type byte.
///
/// Thus, [`Startup`] does not implement [`FrontendProtocol`]
#[derive(Debug)]
pub struct Startup<'a> {
    /// The database user name to connect as. Required; there is no default.
    pub user: &'a str,
    /// The database to connect to. Defaults to the user name.
    pub database: Option<&'a str>,
}

impl Startup<'_> {
    /// Int32(196608)
    ///
    /// The most significant 16 bits are the major version number (3 for the protocol described here).
    /// The least significant 16 bits are the minor version number (0 for the protocol described here).
    pub const PROTOCOL_VERSION: i32 = 196608;

    pub fn write(self, buf: &mut BytesMut) {
        let offset = buf.len();

        // Length of message contents in bytes, including self.
        // reserve 4 bytes for length
        buf.put_i32(0);

        buf.put_i32(Self::PROTOCOL_VERSION);

        // The protocol version number is followed by one or more pairs of
        // parameter name and value strings.

        buf.put_nul_str("user");
        buf.put_nul_str(self.user);

        if let Some(db) = self.database {
            buf.put_nul_str("database");
            buf.put_nul_str(db);
        }

        // A zero byte is required as a terminator after the last name/value pair.
        buf.put_u8(b'\0');

        // write the length
        let mut written_buf = &mut buf[offset..];
        written_buf.put_i32(written_buf.len().to_i32());
    }
}

/// Identifies the message as a password response.
#[derive(Debug)]
pub struct PasswordMessage<'a> {
    /// The password (encrypted, if requested).
    pub password: &'a str,
}

impl FrontendProtocol for PasswordMessage<'_> {
    const MSGTYPE: u8 = b'p';

    fn size_hint(&self) -> i32 {
        self.password.nul_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_str(self.password);
    }
}

/// Identifies the message as a simple query
#[derive(Debug)]
pub struct Query<'a> {
    /// the query string itself
    pub sql: &'a str,
}

impl FrontendProtocol for Query<'_> {
    const MSGTYPE: u8 = b'Q';

    fn size_hint(&self) -> i32 {
        self.sql.nul_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_str(self.sql);
    }
}

/// Identifies the message as a Parse command
#[derive(Debug)]
pub struct Parse<'a> {
    /// prepared statement name (an empty string selects the unnamed prepared statement).
    pub prepare_name: &'a str,
    /// The query string to be parsed.
    pub sql: &'a str,
    /// Object IDs of the parameter data types.
    ///
    /// Note that this is not an indication of the number of parameters that might appear in the query string,
    /// only the number that the frontend wants to prespecify types for.
    ///
    /// Placing a zero here is equivalent to leaving the type unspecified.
    pub oids: &'a [Oid],
}

impl FrontendProtocol for Parse<'_> {
    const MSGTYPE: u8 = b'P';

    fn size_hint(&self) -> i32 {
        self.prepare_name.nul_len()
            + self.sql.nul_len()
            + 2
            + (self.oids.len().to_i32() * 4)
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_str(self.prepare_name);
        buf.put_nul_str(self.sql);
        buf.put_i16(self.oids.len().to_i16());
        for oid in self.oids {
            buf.put_u32(*oid);
        }
    }
}

/// Identifies the message as a Bind command.
///
/// A parameter value of [`None`] is sent as a NULL (length `-1`, no value
/// bytes). One format code is sent for all parameters and one for all result
/// columns, the compact form the protocol allows.
#[derive(Debug)]
pub struct Bind<'a> {
    /// The name of the destination portal (an empty string selects the unnamed portal).
    pub portal_name: &'a str,
    /// The name of the source prepared statement (an empty string selects the unnamed prepared statement).
    pub stmt_name: &'a str,
    /// The format shared by every parameter value.
    pub param_format: PgFormat,
    /// The parameter values, in the format indicated by `param_format`.
    pub params: &'a [Option<&'a [u8]>],
    /// The format shared by every result column.
    pub result_format: PgFormat,
}

impl FrontendProtocol for Bind<'_> {
    const MSGTYPE: u8 = b'B';

    fn size_hint(&self) -> i32 {
        self.portal_name.nul_len()
            + self.stmt_name.nul_len()
            // param format count (i16) + the shared format code (i16)
            + 2 + 2
            // param count (i16)
            + 2
            + self.params.iter().fold(0i32, |acc, param| {
                acc + 4 + param.map_or(0, |v| v.len().to_i32())
            })
            // result format count (i16) + the shared format code (i16)
            + 2 + 2
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_str(self.portal_name);
        buf.put_nul_str(self.stmt_name);

        buf.put_i16(1);
        buf.put_i16(self.param_format.format_code());

        buf.put_i16(self.params.len().to_i16());
        for param in self.params {
            match param {
                Some(value) => {
                    buf.put_i32(value.len().to_i32());
                    buf.put_slice(value);
                }
                None => buf.put_i32(-1),
            }
        }

        buf.put_i16(1);
        buf.put_i16(self.result_format.format_code());
    }
}

/// Identifies the message as an Execute command
#[derive(Debug)]
pub struct Execute<'a> {
    /// The name of the portal to execute (an empty string selects the unnamed portal).
    pub portal_name: &'a str,
    /// Maximum number of rows to return, if portal contains a query that returns rows
    /// (ignored otherwise). Zero denotes “no limit”.
    pub max_rows: i32,
}

impl FrontendProtocol for Execute<'_> {
    const MSGTYPE: u8 = b'E';

    fn size_hint(&self) -> i32 {
        self.portal_name.nul_len() + 4
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_str(self.portal_name);
        buf.put_i32(self.max_rows);
    }
}

/// Identifies the message as a Describe command.
#[derive(Debug)]
pub struct Describe<'a> {
    /// `'S'` to describe a prepared statement; or `'P'` to describe a portal.
    pub kind: u8,
    /// The name of the prepared statement or portal to describe
    /// (an empty string selects the unnamed prepared statement or portal).
    pub name: &'a str,
}

impl FrontendProtocol for Describe<'_> {
    const MSGTYPE: u8 = b'D';

    fn size_hint(&self) -> i32 {
        1 + self.name.nul_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u8(self.kind);
        buf.put_nul_str(self.name);
    }
}

/// Identifies the message as a Close command
#[derive(Debug)]
pub struct Close<'a> {
    /// `'S'` to close a prepared statement; or `'P'` to close a portal.
    pub variant: u8,
    /// The name of the prepared statement or portal to close
    /// (an empty string selects the unnamed prepared statement or portal).
    pub name: &'a str,
}

impl FrontendProtocol for Close<'_> {
    const MSGTYPE: u8 = b'C';

    fn size_hint(&self) -> i32 {
        1 + self.name.nul_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u8(self.variant);
        buf.put_nul_str(self.name);
    }
}

/// Identifies the message as a Flush command
#[derive(Debug)]
pub struct Flush;

impl FrontendProtocol for Flush {
    const MSGTYPE: u8 = b'H';

    fn size_hint(&self) -> i32 { 0 }

    fn encode(self, _: impl BufMut) { }
}

/// Identifies the message as a Sync command
#[derive(Debug)]
pub struct Sync;

impl FrontendProtocol for Sync {
    const MSGTYPE: u8 = b'S';

    fn size_hint(&self) -> i32 { 0 }

    fn encode(self, _: impl BufMut) { }
}

/// Identifies the message as a termination
#[derive(Debug)]
pub struct Terminate;

impl FrontendProtocol for Terminate {
    const MSGTYPE: u8 = b'X';

    fn size_hint(&self) -> i32 { 0 }

    fn encode(self, _: impl BufMut) { }
}

#[cfg(test)]
mod test {
    use super::*;

    fn frame<F: FrontendProtocol>(msg: F) -> BytesMut {
        let mut buf = BytesMut::new();
        write(msg, &mut buf);
        buf
    }

    fn frame_len(buf: &[u8]) -> i32 {
        i32::from_be_bytes(buf[1..5].try_into().unwrap())
    }

    #[test]
    fn query_frame() {
        let buf = frame(Query { sql: "SELECT 1" });
        assert_eq!(&buf[..], b"Q\x00\x00\x00\x0dSELECT 1\x00");
        assert_eq!(frame_len(&buf) as usize, buf.len() - 1);
    }

    #[test]
    fn barrier_frames() {
        assert_eq!(&frame(Flush)[..], b"H\x00\x00\x00\x04");
        assert_eq!(&frame(Sync)[..], b"S\x00\x00\x00\x04");
        assert_eq!(&frame(Terminate)[..], b"X\x00\x00\x00\x04");
    }

    #[test]
    fn parse_frame() {
        let buf = frame(Parse { prepare_name: "s", sql: "SELECT $1", oids: &[23] });
        assert_eq!(buf[0], b'P');
        assert_eq!(frame_len(&buf), 22);
        assert_eq!(&buf[5..], b"s\x00SELECT $1\x00\x00\x01\x00\x00\x00\x17");
    }

    #[test]
    fn bind_frame_with_null() {
        let buf = frame(Bind {
            portal_name: "",
            stmt_name: "",
            param_format: PgFormat::Text,
            params: &[Some(&b"1"[..]), None],
            result_format: PgFormat::Text,
        });
        assert_eq!(buf[0], b'B');
        assert_eq!(frame_len(&buf) as usize, buf.len() - 1);
        assert_eq!(
            &buf[5..],
            b"\x00\x00\
              \x00\x01\x00\x00\
              \x00\x02\
              \x00\x00\x00\x011\
              \xff\xff\xff\xff\
              \x00\x01\x00\x00",
        );
    }

    #[test]
    fn describe_and_close_frames() {
        let buf = frame(Describe { kind: b'S', name: "s" });
        assert_eq!(&buf[..], b"D\x00\x00\x00\x07Ss\x00");

        let buf = frame(Close { variant: b'P', name: "p" });
        assert_eq!(&buf[..], b"C\x00\x00\x00\x07Pp\x00");
    }

    #[test]
    fn execute_frame() {
        let buf = frame(Execute { portal_name: "p", max_rows: 0 });
        assert_eq!(&buf[..], b"E\x00\x00\x00\x0ap\x00\x00\x00\x00\x00");
    }

    #[test]
    fn password_frame() {
        let buf = frame(PasswordMessage { password: "secret" });
        assert_eq!(&buf[..], b"p\x00\x00\x00\x0bsecret\x00");
    }

    #[test]
    fn startup_message() {
        let mut buf = BytesMut::new();
        Startup { user: "u", database: Some("db") }.write(&mut buf);

        // no tag byte, length includes itself
        assert_eq!(&buf[..4], &28i32.to_be_bytes());
        assert_eq!(&buf[4..8], &[0x00, 0x03, 0x00, 0x00]);
        assert_eq!(&buf[8..], b"user\x00u\x00database\x00db\x00\x00");
    }
}
