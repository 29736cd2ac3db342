//! Session parameters reported by the server at startup.
use crate::{common::ByteStr, postgres::backend::ParameterStatus};

/// Server version split into numeric components.
///
/// The server reports a version string such as `"10.4 (Ubuntu 10.4)"`; the
/// leading run of digits and dots is parsed, missing components default to
/// zero, and whatever trails it is kept verbatim in `suffix`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerVersion {
    pub major: u16,
    pub minor: u16,
    pub revision: u16,
    pub suffix: ByteStr,
}

impl std::fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}{}", self.major, self.minor, self.revision, self.suffix)
    }
}

/// Session parameters collected from the startup `ParameterStatus` stream.
#[derive(Clone, Debug, Default)]
pub struct ConnectionParameters {
    pub server_version: ServerVersion,
    /// Whether the server passes datetimes as 8-byte integers.
    pub integer_datetimes: bool,
    pub server_encoding: ByteStr,
}

impl ConnectionParameters {
    /// Fold one startup parameter report in.
    ///
    /// Parameters this library does not track are ignored.
    pub(crate) fn apply(&mut self, status: &ParameterStatus) {
        match status.name.as_str() {
            "server_version" => self.server_version = parse_server_version(&status.value),
            "integer_datetimes" => {
                self.integer_datetimes = parse_integer_datetimes(&status.value)
            }
            "server_encoding" => self.server_encoding = status.value.clone(),
            _ => {}
        }
    }
}

/// Split a server version report into numeric components and a suffix.
pub(crate) fn parse_server_version(value: &str) -> ServerVersion {
    let numeric_len = value
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(value.len());
    let (numeric, suffix) = value.split_at(numeric_len);

    let mut components = numeric.split('.').map(|c| c.parse().unwrap_or(0));

    ServerVersion {
        major: components.next().unwrap_or(0),
        minor: components.next().unwrap_or(0),
        revision: components.next().unwrap_or(0),
        suffix: suffix.into(),
    }
}

/// The values postgres reports for an enabled boolean parameter.
pub(crate) fn parse_integer_datetimes(value: &str) -> bool {
    matches!(value, "on" | "yes" | "1")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version_with_suffix() {
        let version = parse_server_version("10.4 (Ubuntu 10.4)");
        assert_eq!(version.major, 10);
        assert_eq!(version.minor, 4);
        assert_eq!(version.revision, 0);
        assert_eq!(version.suffix, " (Ubuntu 10.4)");
    }

    #[test]
    fn version_three_components() {
        let version = parse_server_version("9.6.1");
        assert_eq!((version.major, version.minor, version.revision), (9, 6, 1));
        assert_eq!(version.suffix, "");
    }

    #[test]
    fn version_beta_suffix() {
        let version = parse_server_version("15beta1");
        assert_eq!((version.major, version.minor, version.revision), (15, 0, 0));
        assert_eq!(version.suffix, "beta1");
    }

    #[test]
    fn integer_datetimes_values() {
        assert!(parse_integer_datetimes("on"));
        assert!(parse_integer_datetimes("yes"));
        assert!(parse_integer_datetimes("1"));
        assert!(!parse_integer_datetimes("off"));
        assert!(!parse_integer_datetimes("true"));
        assert!(!parse_integer_datetimes(""));
    }
}
