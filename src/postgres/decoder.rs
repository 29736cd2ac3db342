//! Streaming backend message decoder.
use bytes::{Buf, BytesMut};

use super::{BackendMessage, BackendProtocol, ProtocolError};

/// Frame header: msgtype + length.
const HEADER: usize = 1 + 4;

/// An incremental decoder of the backend message stream.
///
/// The socket hands over chunks of whatever length it happens to return;
/// the decoder buffers them and yields a message once a frame is complete.
/// [`next`][Decoder::next] returns `Ok(None)` when more bytes are required,
/// it never fails on a partial frame.
#[derive(Debug, Default)]
pub struct Decoder {
    buf: BytesMut,
}

impl Decoder {
    pub fn new() -> Decoder {
        Decoder { buf: BytesMut::new() }
    }

    /// Feed a chunk of bytes read from the transport.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Buffer to read socket bytes into, with space reserved.
    pub(crate) fn buf_mut(&mut self, reserve: usize) -> &mut BytesMut {
        self.buf.reserve(reserve);
        &mut self.buf
    }

    /// Try to decode the next message out of the buffered bytes.
    pub fn next(&mut self) -> Result<Option<BackendMessage>, ProtocolError> {
        let Some(mut header) = self.buf.get(..HEADER) else {
            return Ok(None);
        };

        let msgtype = header.get_u8();
        let len = header.get_i32();

        // the length count includes itself, but not the message-type byte
        if len < 4 {
            return Err(ProtocolError::InvalidLength(len));
        }
        let len = len as usize;

        if self.buf.len() - 1/*msgtype*/ < len {
            return Ok(None);
        }

        self.buf.advance(HEADER);
        let body = self.buf.split_to(len - 4).freeze();

        BackendMessage::decode(msgtype, body).map(Some)
    }
}

#[cfg(test)]
mod test {
    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::postgres::backend::{
        Authentication, BackendKeyData, DataRow, ReadyForQuery, TransactionStatus,
    };

    fn frame(msgtype: u8, body: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u8(msgtype);
        buf.put_i32(4 + body.len() as i32);
        buf.put_slice(body);
        buf.to_vec()
    }

    fn decode_one(bytes: &[u8]) -> BackendMessage {
        let mut decoder = Decoder::new();
        decoder.extend(bytes);
        let msg = decoder.next().unwrap().expect("one full message");
        assert!(decoder.next().unwrap().is_none(), "no leftover message");
        msg
    }

    #[test]
    fn decodes_across_arbitrary_chunk_boundaries() {
        let bytes = frame(b'S', b"server_encoding\0UTF8\0");

        for split in 0..=bytes.len() {
            let mut decoder = Decoder::new();
            decoder.extend(&bytes[..split]);
            if split < bytes.len() {
                assert!(decoder.next().unwrap().is_none(), "split at {split}");
                decoder.extend(&bytes[split..]);
            }
            match decoder.next().unwrap().expect("message after full frame") {
                BackendMessage::ParameterStatus(status) => {
                    assert_eq!(status.name, "server_encoding");
                    assert_eq!(status.value, "UTF8");
                }
                other => panic!("unexpected message {other:?}"),
            }
        }
    }

    #[test]
    fn decodes_two_concatenated_frames_in_order() {
        let mut bytes = frame(b'K', &[0, 0, 0, 7, 0, 0, 0, 9]);
        bytes.extend_from_slice(&frame(b'Z', b"I"));

        let mut decoder = Decoder::new();
        decoder.extend(&bytes);

        assert_eq!(
            decoder.next().unwrap(),
            Some(BackendMessage::BackendKeyData(BackendKeyData {
                process_id: 7,
                secret_key: 9,
            })),
        );
        assert_eq!(
            decoder.next().unwrap(),
            Some(BackendMessage::ReadyForQuery(ReadyForQuery {
                status: TransactionStatus::Idle,
            })),
        );
        assert_eq!(decoder.next().unwrap(), None);
    }

    #[test]
    fn never_reads_past_declared_length() {
        // `ReadyForQuery` followed by garbage that is not a full frame
        let mut bytes = frame(b'Z', b"T");
        bytes.extend_from_slice(b"E\x00\x00");

        let mut decoder = Decoder::new();
        decoder.extend(&bytes);

        assert_eq!(
            decoder.next().unwrap(),
            Some(BackendMessage::ReadyForQuery(ReadyForQuery {
                status: TransactionStatus::InBlock,
            })),
        );
        assert_eq!(decoder.next().unwrap(), None);
    }

    #[test]
    fn null_column_consumes_no_payload() {
        let mut body = BytesMut::new();
        body.put_u16(3);
        body.put_i32(2);
        body.put_slice(b"14");
        body.put_i32(-1);
        body.put_i32(0);

        match decode_one(&frame(b'D', &body)) {
            BackendMessage::DataRow(DataRow { columns }) => {
                assert_eq!(columns.len(), 3);
                assert_eq!(columns[0].as_deref(), Some(&b"14"[..]));
                assert_eq!(columns[1], None);
                assert_eq!(columns[2].as_deref(), Some(&b""[..]));
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn md5_authentication_request() {
        let mut body = BytesMut::new();
        body.put_u32(5);
        body.put_slice(&[0xde, 0xad, 0xbe, 0xef]);

        match decode_one(&frame(b'R', &body)) {
            BackendMessage::Authentication(Authentication::MD5Password { salt }) => {
                assert_eq!(salt, [0xde, 0xad, 0xbe, 0xef]);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn unknown_message_type() {
        let err = {
            let mut decoder = Decoder::new();
            decoder.extend(&frame(b'@', b""));
            decoder.next().unwrap_err()
        };
        assert!(matches!(err, ProtocolError::UnknownMessage(b'@')));
    }

    #[test]
    fn bogus_frame_length() {
        let mut decoder = Decoder::new();
        decoder.extend(b"Z\x00\x00\x00\x01");
        assert!(matches!(
            decoder.next().unwrap_err(),
            ProtocolError::InvalidLength(1),
        ));
    }

    #[test]
    fn truncated_body_is_an_error() {
        // DataRow claiming one column of 100 bytes, body ends early
        let mut body = BytesMut::new();
        body.put_u16(1);
        body.put_i32(100);
        body.put_slice(b"short");

        let mut decoder = Decoder::new();
        decoder.extend(&frame(b'D', &body));
        assert!(matches!(
            decoder.next().unwrap_err(),
            ProtocolError::Truncated,
        ));
    }
}
