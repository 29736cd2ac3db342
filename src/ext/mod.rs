use bytes::{Buf, BufMut, Bytes};

use crate::{common::ByteStr, postgres::ProtocolError};

/// Integer signess in postgres docs is awful.
pub(crate) trait UsizeExt {
    /// length is usize in rust, while postgres wants i32,
    /// this will panic when overflow instead of wrapping
    fn to_i32(self) -> i32;
    /// length is usize in rust, while postgres wants i16,
    /// this will panic when overflow instead of wrapping
    fn to_i16(self) -> i16;
}

impl UsizeExt for usize {
    fn to_i32(self) -> i32 {
        self.try_into().expect("message size too large for protocol")
    }

    fn to_i16(self) -> i16 {
        self.try_into().expect("message size too large for protocol")
    }
}

pub(crate) trait StrExt {
    /// postgres String must be nul terminated
    fn nul_len(&self) -> i32;
}

impl StrExt for str {
    fn nul_len(&self) -> i32 {
        self.len().to_i32() + 1/* nul */
    }
}

pub(crate) trait BufMutExt {
    /// postgres String must be nul terminated
    fn put_nul_str(&mut self, string: &str);
}

impl<B: BufMut> BufMutExt for B {
    fn put_nul_str(&mut self, string: &str) {
        self.put(string.as_bytes());
        self.put_u8(b'\0');
    }
}

/// Checked reads over a message body.
///
/// The framing layer only guarantees the body length matches the length
/// prefix; the structure inside may still lie, so every read here reports
/// truncation instead of panicking.
pub(crate) trait BytesExt {
    fn try_get_u8(&mut self) -> Result<u8, ProtocolError>;
    fn try_get_i16(&mut self) -> Result<i16, ProtocolError>;
    fn try_get_u16(&mut self) -> Result<u16, ProtocolError>;
    fn try_get_i32(&mut self) -> Result<i32, ProtocolError>;
    fn try_get_u32(&mut self) -> Result<u32, ProtocolError>;
    fn try_get_bytes(&mut self, len: usize) -> Result<Bytes, ProtocolError>;
    fn try_get_nul_bytes(&mut self) -> Result<Bytes, ProtocolError>;
    fn try_get_nul_bytestr(&mut self) -> Result<ByteStr, ProtocolError>;
}

impl BytesExt for Bytes {
    fn try_get_u8(&mut self) -> Result<u8, ProtocolError> {
        if self.remaining() < 1 {
            return Err(ProtocolError::truncated());
        }
        Ok(self.get_u8())
    }

    fn try_get_i16(&mut self) -> Result<i16, ProtocolError> {
        if self.remaining() < 2 {
            return Err(ProtocolError::truncated());
        }
        Ok(self.get_i16())
    }

    fn try_get_u16(&mut self) -> Result<u16, ProtocolError> {
        if self.remaining() < 2 {
            return Err(ProtocolError::truncated());
        }
        Ok(self.get_u16())
    }

    fn try_get_i32(&mut self) -> Result<i32, ProtocolError> {
        if self.remaining() < 4 {
            return Err(ProtocolError::truncated());
        }
        Ok(self.get_i32())
    }

    fn try_get_u32(&mut self) -> Result<u32, ProtocolError> {
        if self.remaining() < 4 {
            return Err(ProtocolError::truncated());
        }
        Ok(self.get_u32())
    }

    fn try_get_bytes(&mut self, len: usize) -> Result<Bytes, ProtocolError> {
        if self.remaining() < len {
            return Err(ProtocolError::truncated());
        }
        Ok(self.split_to(len))
    }

    fn try_get_nul_bytes(&mut self) -> Result<Bytes, ProtocolError> {
        let Some(end) = self.iter().position(|e| matches!(e, b'\0')) else {
            return Err(ProtocolError::truncated());
        };
        let me = self.split_to(end);
        Buf::advance(self, 1); // nul
        Ok(me)
    }

    fn try_get_nul_bytestr(&mut self) -> Result<ByteStr, ProtocolError> {
        Ok(ByteStr::from_utf8(self.try_get_nul_bytes()?)?)
    }
}
