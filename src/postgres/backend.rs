//! Postgres Backend Messages
use bytes::Bytes;

use super::{CommandResult, Diagnostic, Oid, PgFormat, ProtocolError, command};
use crate::{common::ByteStr, ext::BytesExt};

/// A type that can be decoded from a postgres backend message
pub trait BackendProtocol: Sized {
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError>;
}

/// Postgres backend messages
#[derive(Clone, Debug, PartialEq)]
pub enum BackendMessage {
    Authentication(Authentication),
    BackendKeyData(BackendKeyData),
    BindComplete(BindComplete),
    CloseComplete(CloseComplete),
    CommandComplete(CommandComplete),
    DataRow(DataRow),
    EmptyQueryResponse(EmptyQueryResponse),
    ErrorResponse(ErrorResponse),
    NoData(NoData),
    NoticeResponse(NoticeResponse),
    NotificationResponse(NotificationResponse),
    ParameterDescription(ParameterDescription),
    ParameterStatus(ParameterStatus),
    ParseComplete(ParseComplete),
    PortalSuspended(PortalSuspended),
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
}

macro_rules! match_backend {
    ($($name:ident,)*) => {
        impl BackendMessage {
            pub fn msgtype(&self) -> u8 {
                match self {
                    $(Self::$name(_) => $name::MSGTYPE,)*
                }
            }

            /// Get message name from message type.
            ///
            /// Returns `"Unknown"` for unknown message type.
            pub fn message_name(msgtype: u8) -> &'static str {
                match msgtype {
                    $($name::MSGTYPE => stringify!($name),)*
                    _ => "Unknown",
                }
            }
        }

        impl BackendProtocol for BackendMessage {
            fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
                let message = match msgtype {
                    $($name::MSGTYPE => Self::$name(<$name as BackendProtocol>::decode(msgtype, body)?),)*
                    _ => return Err(ProtocolError::unknown(msgtype)),
                };
                Ok(message)
            }
        }
    };
}

match_backend! {
    Authentication,
    BackendKeyData,
    BindComplete,
    CloseComplete,
    CommandComplete,
    DataRow,
    EmptyQueryResponse,
    ErrorResponse,
    NoData,
    NoticeResponse,
    NotificationResponse,
    ParameterDescription,
    ParameterStatus,
    ParseComplete,
    PortalSuspended,
    ReadyForQuery,
    RowDescription,
}

macro_rules! assert_msgtype {
    ($typ:ident) => {
        if Self::MSGTYPE != $typ {
            return Err(ProtocolError::unexpected(Self::MSGTYPE, $typ));
        }
    };
}

/// Identifies the message as an authentication request.
#[derive(Clone, Debug, PartialEq)]
pub enum Authentication {
    /// Specifies that the authentication was successful.
    Ok,
    /// Specifies that a clear-text password is required.
    CleartextPassword,
    /// Specifies that an MD5-encrypted password is required.
    MD5Password {
        /// The salt to use when encrypting the password.
        salt: [u8; 4],
    },
    /// Specifies that GSSAPI authentication is required.
    GSS,
    /// Specifies that SSPI authentication is required.
    SSPI,
    /// GSSAPI or SSPI authentication data.
    GSSContinue { data: Bytes },
}

impl Authentication {
    pub const MSGTYPE: u8 = b'R';
}

impl BackendProtocol for Authentication {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        let auth = match body.try_get_u32()? {
            0 => Authentication::Ok,
            3 => Authentication::CleartextPassword,
            5 => Authentication::MD5Password { salt: body.try_get_u32()?.to_be_bytes() },
            7 => Authentication::GSS,
            8 => Authentication::GSSContinue { data: body },
            9 => Authentication::SSPI,
            auth => return Err(ProtocolError::unknown_auth(auth)),
        };
        Ok(auth)
    }
}

/// Identifies the message as cancellation key data.
///
/// The frontend must save these values if it wishes to be able to issue
/// CancelRequest messages later.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendKeyData {
    /// The process ID of this backend.
    pub process_id: u32,
    /// The secret key of this backend.
    pub secret_key: u32,
}

impl BackendKeyData {
    pub const MSGTYPE: u8 = b'K';
}

impl BackendProtocol for BackendKeyData {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        Ok(Self {
            process_id: body.try_get_u32()?,
            secret_key: body.try_get_u32()?,
        })
    }
}

/// Identifies the message as a command-completed response
#[derive(Clone, Debug, PartialEq)]
pub struct CommandComplete {
    /// The command tag, `"SELECT 1"` for example.
    pub tag: ByteStr,
    /// The tag parsed into command and row count.
    pub result: CommandResult,
}

impl CommandComplete {
    pub const MSGTYPE: u8 = b'C';
}

impl BackendProtocol for CommandComplete {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        let tag = body.try_get_nul_bytestr()?;
        let result = command::parse_tag(&tag)?;
        Ok(Self { tag, result })
    }
}

/// Identifies the message as a data row.
#[derive(Clone, Debug, PartialEq)]
pub struct DataRow {
    /// The column values. A value of [`None`] is an SQL NULL; its wire
    /// length is `-1` and it carries no value bytes.
    pub columns: Vec<Option<Bytes>>,
}

impl DataRow {
    pub const MSGTYPE: u8 = b'D';
}

impl BackendProtocol for DataRow {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        let column_len = body.try_get_u16()?;
        let mut columns = Vec::with_capacity(column_len as usize);
        for _ in 0..column_len {
            let len = body.try_get_i32()?;
            let column = match len {
                -1 => None,
                len if len < 0 => return Err(ProtocolError::InvalidLength(len)),
                len => Some(body.try_get_bytes(len as usize)?),
            };
            columns.push(column);
        }
        Ok(Self { columns })
    }
}

/// Identifies the message as an error.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub diagnostic: Diagnostic,
}

impl ErrorResponse {
    pub const MSGTYPE: u8 = b'E';
}

impl BackendProtocol for ErrorResponse {
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        Ok(Self { diagnostic: Diagnostic::parse(body)? })
    }
}

/// A warning message. The frontend should display the message.
#[derive(Clone, Debug, PartialEq)]
pub struct NoticeResponse {
    pub diagnostic: Diagnostic,
}

impl NoticeResponse {
    pub const MSGTYPE: u8 = b'N';
}

impl BackendProtocol for NoticeResponse {
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        Ok(Self { diagnostic: Diagnostic::parse(body)? })
    }
}

/// Identifies the message as a notification response.
///
/// Delivered raw; this library does not dispatch `LISTEN` channels.
#[derive(Clone, Debug, PartialEq)]
pub struct NotificationResponse {
    /// The process ID of the notifying backend process.
    pub process_id: u32,
    /// The name of the channel that the notify has been raised on.
    pub channel: ByteStr,
    /// The “payload” string passed from the notifying process.
    pub payload: ByteStr,
}

impl NotificationResponse {
    pub const MSGTYPE: u8 = b'A';
}

impl BackendProtocol for NotificationResponse {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        Ok(Self {
            process_id: body.try_get_u32()?,
            channel: body.try_get_nul_bytestr()?,
            payload: body.try_get_nul_bytestr()?,
        })
    }
}

/// Identifies the message as a parameter description.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterDescription {
    /// The object ID of each parameter data type of the statement.
    pub oids: Vec<Oid>,
}

impl ParameterDescription {
    pub const MSGTYPE: u8 = b't';
}

impl BackendProtocol for ParameterDescription {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        let param_len = body.try_get_u16()?;
        let mut oids = Vec::with_capacity(param_len as usize);
        for _ in 0..param_len {
            oids.push(body.try_get_u32()?);
        }
        Ok(Self { oids })
    }
}

/// Identifies the message as a run-time parameter status report
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterStatus {
    /// The name of the run-time parameter being reported
    pub name: ByteStr,
    /// The current value of the parameter
    pub value: ByteStr,
}

impl ParameterStatus {
    pub const MSGTYPE: u8 = b'S';
}

impl BackendProtocol for ParameterStatus {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        Ok(Self {
            name: body.try_get_nul_bytestr()?,
            value: body.try_get_nul_bytestr()?,
        })
    }
}

/// Current backend transaction status indicator carried by
/// [`ReadyForQuery`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    /// `'I'`, idle (not in a transaction block).
    Idle,
    /// `'T'`, in a transaction block.
    InBlock,
    /// `'E'`, in a failed transaction block
    /// (queries will be rejected until block is ended).
    Failed,
}

impl TransactionStatus {
    pub(crate) fn from_code(code: u8) -> Result<Self, ProtocolError> {
        match code {
            b'I' => Ok(Self::Idle),
            b'T' => Ok(Self::InBlock),
            b'E' => Ok(Self::Failed),
            _ => Err(ProtocolError::UnknownTransactionStatus(code)),
        }
    }
}

/// ReadyForQuery is sent whenever the backend is ready for a new query cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadyForQuery {
    pub status: TransactionStatus,
}

impl ReadyForQuery {
    pub const MSGTYPE: u8 = b'Z';
}

impl BackendProtocol for ReadyForQuery {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        Ok(Self {
            status: TransactionStatus::from_code(body.try_get_u8()?)?,
        })
    }
}

/// Describes a single field of a [`RowDescription`].
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescription {
    /// The field name.
    pub name: ByteStr,
    /// If the field can be identified as a column of a specific table,
    /// the object ID of the table; otherwise zero.
    pub table_oid: Oid,
    /// If the field can be identified as a column of a specific table,
    /// the attribute number of the column; otherwise zero.
    pub column_attr: u16,
    /// The object ID of the field's data type.
    pub type_oid: Oid,
    /// The data type size (see `pg_type.typlen`).
    /// Note that negative values denote variable-width types.
    pub type_size: i16,
    /// The type modifier (see `pg_attribute.atttypmod`).
    /// The meaning of the modifier is type-specific.
    pub type_modifier: i32,
    /// The format code being used for the field. In a RowDescription
    /// returned from the statement variant of Describe, the format code
    /// is not yet known and will always be zero.
    pub format: PgFormat,
}

impl FieldDescription {
    fn decode(body: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: body.try_get_nul_bytestr()?,
            table_oid: body.try_get_u32()?,
            column_attr: body.try_get_u16()?,
            type_oid: body.try_get_u32()?,
            type_size: body.try_get_i16()?,
            type_modifier: body.try_get_i32()?,
            format: PgFormat::from_code(body.try_get_i16()?)?,
        })
    }
}

/// Identifies the message as a row description.
#[derive(Clone, Debug, PartialEq)]
pub struct RowDescription {
    /// Description of each field of the rows about to be returned.
    pub fields: Vec<FieldDescription>,
}

impl RowDescription {
    pub const MSGTYPE: u8 = b'T';
}

impl BackendProtocol for RowDescription {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        let field_len = body.try_get_u16()?;
        let mut fields = Vec::with_capacity(field_len as usize);
        for _ in 0..field_len {
            fields.push(FieldDescription::decode(&mut body)?);
        }
        Ok(Self { fields })
    }
}

macro_rules! unit_msg {
    ($(
        $(#[$doc:meta])* struct $name:ident, $ty:literal;
    )*) => {$(
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name;

        impl $name {
            pub const MSGTYPE: u8 = $ty;
        }

        impl BackendProtocol for $name {
            fn decode(msgtype: u8, _: Bytes) -> Result<Self, ProtocolError> {
                assert_msgtype!(msgtype);
                Ok(Self)
            }
        }
    )*};
}

unit_msg! {
    /// Identifies the message as a Bind-complete indicator.
    struct BindComplete, b'2';

    /// Identifies the message as a Close-complete indicator.
    struct CloseComplete, b'3';

    /// Identifies the message as a response to an empty query string.
    ///
    /// This substitutes for CommandComplete.
    struct EmptyQueryResponse, b'I';

    /// Identifies the message as a no-data indicator.
    struct NoData, b'n';

    /// Identifies the message as a Parse-complete indicator.
    struct ParseComplete, b'1';

    /// Identifies the message as a portal-suspended indicator.
    ///
    /// Note this only appears if an Execute message's row-count limit
    /// was reached.
    struct PortalSuspended, b's';
}
