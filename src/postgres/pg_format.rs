use super::ProtocolError;

/// Postgres data transmission format.
///
/// Data of a particular data type might be transmitted in any of several
/// different formats. As of PostgreSQL 7.4 the only supported formats are
/// “text” and “binary”. Text has format code zero, and Binary has format
/// code one.
///
/// Clients can specify a format code for each transmitted parameter value
/// and for each column of a query result.
///
/// <https://www.postgresql.org/docs/current/protocol-overview.html#PROTOCOL-FORMAT-CODES>
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PgFormat {
    /// Text has format code zero.
    ///
    /// In the text transmitted representation, there is no trailing null
    /// character; the frontend must add one to received values if it wants
    /// to process them as C strings.
    #[default]
    Text,
    /// Binary has format code one.
    ///
    /// Binary representations for integers use network byte order (most
    /// significant byte first).
    Binary,
}

impl PgFormat {
    /// Return format code for current format.
    pub fn format_code(&self) -> i16 {
        match self {
            PgFormat::Text => 0,
            PgFormat::Binary => 1,
        }
    }

    /// Translate a format code back into a format.
    pub fn from_code(code: i16) -> Result<PgFormat, ProtocolError> {
        match code {
            0 => Ok(PgFormat::Text),
            1 => Ok(PgFormat::Binary),
            _ => Err(ProtocolError::UnknownFormat(code)),
        }
    }
}
