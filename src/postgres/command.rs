//! Command tag parsing.
use super::{Oid, ProtocolError};

/// Decoded `CommandComplete` tag.
///
/// The tag is usually a single word that identifies which SQL command was
/// completed, followed by the affected row count. For an `INSERT` the word is
/// followed by `oid rows`; oid used to be the object ID of the inserted row
/// but OIDs system columns are not supported anymore, therefore it is always
/// zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandResult {
    Insert { oid: Oid, rows: u64 },
    Delete { rows: u64 },
    Update { rows: u64 },
    Select { rows: u64 },
    Move { rows: u64 },
    Fetch { rows: u64 },
    Copy { rows: u64 },
    /// A command that does not report a row count, `VACUUM` for example.
    Ok,
}

impl CommandResult {
    /// Rows affected, zero for [`CommandResult::Ok`].
    pub fn rows_affected(&self) -> u64 {
        match *self {
            Self::Insert { rows, .. }
            | Self::Delete { rows }
            | Self::Update { rows }
            | Self::Select { rows }
            | Self::Move { rows }
            | Self::Fetch { rows }
            | Self::Copy { rows } => rows,
            Self::Ok => 0,
        }
    }
}

/// Parse a `CommandComplete` tag string.
///
/// An unknown leading word yields [`CommandResult::Ok`]; a known word with
/// malformed trailing integers is a protocol error.
pub(crate) fn parse_tag(tag: &str) -> Result<CommandResult, ProtocolError> {
    let malformed = || ProtocolError::CommandTag(tag.to_owned());

    let mut words = tag.split_whitespace();
    let command = match words.next() {
        Some(command) => command,
        None => return Ok(CommandResult::Ok),
    };

    let mut rows = || {
        words
            .next()
            .and_then(|word| word.parse::<u64>().ok())
            .ok_or_else(|| malformed())
    };

    let result = match command {
        "INSERT" => {
            let oid = rows()?;
            let oid = Oid::try_from(oid).map_err(|_| malformed())?;
            CommandResult::Insert { oid, rows: rows()? }
        }
        "DELETE" => CommandResult::Delete { rows: rows()? },
        "UPDATE" => CommandResult::Update { rows: rows()? },
        "SELECT" => CommandResult::Select { rows: rows()? },
        "MOVE" => CommandResult::Move { rows: rows()? },
        "FETCH" => CommandResult::Fetch { rows: rows()? },
        "COPY" => CommandResult::Copy { rows: rows()? },
        _ => CommandResult::Ok,
    };

    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_tags() {
        assert_eq!(
            parse_tag("INSERT 0 3").unwrap(),
            CommandResult::Insert { oid: 0, rows: 3 },
        );
        assert_eq!(parse_tag("SELECT 42").unwrap(), CommandResult::Select { rows: 42 });
        assert_eq!(parse_tag("DELETE 5").unwrap(), CommandResult::Delete { rows: 5 });
        assert_eq!(parse_tag("UPDATE 0").unwrap(), CommandResult::Update { rows: 0 });
        assert_eq!(parse_tag("COPY 120").unwrap(), CommandResult::Copy { rows: 120 });
    }

    #[test]
    fn fallback_tags() {
        assert_eq!(parse_tag("VACUUM").unwrap(), CommandResult::Ok);
        assert_eq!(parse_tag("CREATE TABLE").unwrap(), CommandResult::Ok);
        assert_eq!(parse_tag("").unwrap(), CommandResult::Ok);
    }

    #[test]
    fn malformed_tags() {
        assert!(parse_tag("SELECT x").is_err());
        assert!(parse_tag("INSERT 3").is_err());
        assert!(parse_tag("UPDATE").is_err());
    }
}
