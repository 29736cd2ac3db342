//! Error and notice diagnostics.
//!
//! `ErrorResponse` and `NoticeResponse` share one payload layout: a sequence
//! of `(1-byte key, nul terminated value)` records terminated by a lone nul.
//!
//! <https://www.postgresql.org/docs/current/protocol-error-fields.html>
use bytes::Bytes;

use super::ProtocolError;
use crate::{common::ByteStr, ext::BytesExt};

/// Message severity reported in the `S`/`V` fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Fatal,
    Panic,
    Warning,
    Notice,
    Debug,
    Info,
    Log,
    /// The server reported a severity this library does not know.
    Unknown,
}

impl Severity {
    fn parse(value: &str) -> Severity {
        match value {
            "ERROR" => Self::Error,
            "FATAL" => Self::Fatal,
            "PANIC" => Self::Panic,
            "WARNING" => Self::Warning,
            "NOTICE" => Self::Notice,
            "DEBUG" => Self::Debug,
            "INFO" => Self::Info,
            "LOG" => Self::Log,
            _ => Self::Unknown,
        }
    }
}

/// Structured fields of an `ErrorResponse` or `NoticeResponse`.
///
/// `severity`, `code` and `message` are always present; the remaining fields
/// appear depending on the error. Fields of unrecognized type are silently
/// ignored, as the protocol requires from frontends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// The SQLSTATE code for the error. Not localizable.
    pub code: ByteStr,
    /// The primary human-readable error message.
    pub message: ByteStr,
    pub detail: Option<ByteStr>,
    pub hint: Option<ByteStr>,
    /// Error cursor position as an index into the original query string,
    /// measured in characters, counted from one.
    pub position: Option<u32>,
    pub internal_position: Option<u32>,
    pub internal_query: Option<ByteStr>,
    /// Call stack traceback of the active procedural language functions.
    pub where_: Option<ByteStr>,
    pub schema: Option<ByteStr>,
    pub table: Option<ByteStr>,
    pub column: Option<ByteStr>,
    pub data_type: Option<ByteStr>,
    pub constraint: Option<ByteStr>,
    /// Source-code file name where the error was reported.
    pub file: Option<ByteStr>,
    pub line: Option<u32>,
    pub routine: Option<ByteStr>,
}

impl Diagnostic {
    /// Parse the field records of an `ErrorResponse`/`NoticeResponse` body.
    pub fn parse(mut body: Bytes) -> Result<Diagnostic, ProtocolError> {
        let mut localized_severity = None;
        let mut severity = None;
        let mut code = None;
        let mut message = None;
        let mut detail = None;
        let mut hint = None;
        let mut position = None;
        let mut internal_position = None;
        let mut internal_query = None;
        let mut where_ = None;
        let mut schema = None;
        let mut table = None;
        let mut column = None;
        let mut data_type = None;
        let mut constraint = None;
        let mut file = None;
        let mut line = None;
        let mut routine = None;

        loop {
            let key = body.try_get_u8()?;
            if key == 0 {
                break;
            }
            let value = body.try_get_nul_bytestr()?;
            match key {
                // Severity, in a localized translation of one of ERROR,
                // FATAL, WARNING, etc. Always present.
                b'S' => localized_severity = Some(value),
                // Identical to `S` but never localized. Only in 9.6 and up.
                b'V' => severity = Some(value),
                b'C' => code = Some(value),
                b'M' => message = Some(value),
                b'D' => detail = Some(value),
                b'H' => hint = Some(value),
                b'P' => position = value.parse().ok(),
                b'p' => internal_position = value.parse().ok(),
                b'q' => internal_query = Some(value),
                b'W' => where_ = Some(value),
                b's' => schema = Some(value),
                b't' => table = Some(value),
                b'c' => column = Some(value),
                b'd' => data_type = Some(value),
                b'n' => constraint = Some(value),
                b'F' => file = Some(value),
                b'L' => line = value.parse().ok(),
                b'R' => routine = Some(value),
                // Since more field types might be added in future,
                // frontends should silently ignore fields of unrecognized type.
                _ => {}
            }
        }

        let severity = match severity.or(localized_severity) {
            Some(value) => Severity::parse(&value),
            None => return Err(ProtocolError::MissingErrorField('S')),
        };
        let Some(code) = code else {
            return Err(ProtocolError::MissingErrorField('C'));
        };
        let Some(message) = message else {
            return Err(ProtocolError::MissingErrorField('M'));
        };

        Ok(Diagnostic {
            severity,
            code,
            message,
            detail,
            hint,
            position,
            internal_position,
            internal_query,
            where_,
            schema,
            table,
            column,
            data_type,
            constraint,
            file,
            line,
            routine,
        })
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {} ({})", self.severity, self.message, self.code)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(body: &'static [u8]) -> Result<Diagnostic, ProtocolError> {
        Diagnostic::parse(Bytes::from_static(body))
    }

    #[test]
    fn mandatory_fields() {
        let desc = parse(b"S\0ERROR\0C\022001\0M\0oops\0\0").unwrap();
        assert_eq!(desc.severity, Severity::Error);
        assert_eq!(desc.code, "22001");
        assert_eq!(desc.message, "oops");
        assert_eq!(desc.detail, None);
    }

    #[test]
    fn unlocalized_severity_preferred() {
        let desc = parse(b"S\0FEHLER\0V\0ERROR\0C\042P01\0M\0nope\0\0").unwrap();
        assert_eq!(desc.severity, Severity::Error);

        // without `V`, the possibly localized `S` is all there is
        let desc = parse(b"S\0FEHLER\0C\042P01\0M\0nope\0\0").unwrap();
        assert_eq!(desc.severity, Severity::Unknown);
    }

    #[test]
    fn optional_and_unknown_fields() {
        let desc = parse(
            b"S\0NOTICE\0C\000000\0M\0hi\0D\0a detail\0P\042\0L\0123\0Z\0future\0\0",
        )
        .unwrap();
        assert_eq!(desc.severity, Severity::Notice);
        assert_eq!(desc.detail.as_deref(), Some("a detail"));
        assert_eq!(desc.position, Some(42));
        assert_eq!(desc.line, Some(123));
    }

    #[test]
    fn missing_mandatory_field() {
        let err = parse(b"S\0ERROR\0M\0oops\0\0").unwrap_err();
        assert!(matches!(err, ProtocolError::MissingErrorField('C')));
    }

    #[test]
    fn missing_terminator() {
        assert!(parse(b"S\0ERROR\0C\022001\0M\0oops\0").is_err());
    }
}
