//! Startup phase and authentication.
//!
//! <https://www.postgresql.org/docs/17/protocol-flow.html#PROTOCOL-FLOW-START-UP>
use crate::{
    Error, Result,
    common::verbose,
    postgres::{BackendMessage, ProtocolError, backend, frontend},
    transport::Transport,
};

use super::{Config, ConnectionParameters};

/// Startup phase successful response.
pub(crate) struct StartupOutcome {
    pub backend_key_data: Option<backend::BackendKeyData>,
    pub parameters: ConnectionParameters,
}

/// Perform the startup message exchange and authenticate.
///
/// To begin a session, a frontend opens a connection to the server and
/// sends a startup message. The server then sends an appropriate
/// authentication request message, to which the frontend must reply with an
/// appropriate authentication response message (such as a password).
pub(crate) async fn startup(config: &Config, io: &mut Transport) -> Result<StartupOutcome> {
    io.send_startup(frontend::Startup {
        user: config.user(),
        database: Some(config.dbname()),
    });
    io.flush().await?;

    loop {
        use backend::Authentication::*;
        match io.recv().await? {
            BackendMessage::Authentication(auth) => match auth {
                Ok => break,
                // The frontend must now send a PasswordMessage containing
                // the password in clear-text form.
                CleartextPassword => {
                    io.send(frontend::PasswordMessage { password: config.password() });
                    io.flush().await?;
                }
                // The frontend must now send a PasswordMessage containing
                // the password (with user name) encrypted via MD5, then
                // encrypted again using the 4-byte random salt.
                MD5Password { salt } => {
                    let digest = md5_password(config.user(), config.password(), salt);
                    io.send(frontend::PasswordMessage { password: &digest });
                    io.flush().await?;
                }
                GSS => return Err(Error::unsupported_auth("GSS")),
                SSPI => return Err(Error::unsupported_auth("SSPI")),
                GSSContinue { .. } => return Err(Error::unsupported_auth("GSSContinue")),
            },
            BackendMessage::ErrorResponse(err) => {
                return Err(Error::auth_database(err.diagnostic));
            }
            f => {
                return Err(ProtocolError::unexpected_phase(f.msgtype(), "authentication").into());
            }
        }
    }

    // After having received AuthenticationOk, the frontend must wait for
    // further messages from the server. In the normal case the backend will
    // send some ParameterStatus messages, BackendKeyData, and finally
    // ReadyForQuery. The server frequently bundles all of that together
    // with AuthenticationOk in a single network packet, so decoding simply
    // continues from the leftover bytes.
    let mut parameters = ConnectionParameters::default();
    let mut key_data = None;

    loop {
        match io.recv().await? {
            BackendMessage::ReadyForQuery(_) => break,
            BackendMessage::BackendKeyData(new_key_data) => key_data = Some(new_key_data),
            BackendMessage::ParameterStatus(status) => parameters.apply(&status),
            BackendMessage::NoticeResponse(_notice) => {
                verbose!("startup notice: {}", _notice.diagnostic);
            }
            BackendMessage::ErrorResponse(err) => {
                return Err(Error::auth_database(err.diagnostic));
            }
            f => {
                return Err(ProtocolError::unexpected_phase(f.msgtype(), "startup").into());
            }
        }
    }

    Ok(StartupOutcome { backend_key_data: key_data, parameters })
}

/// Derive the MD5 password response.
///
/// `"md5" + hex(md5(hex(md5(password + user)) + salt))`, lowercase hex.
pub(crate) fn md5_password(user: &str, password: &str, salt: [u8; 4]) -> String {
    use md5::{Digest, Md5};

    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(user.as_bytes());
    let inner = format!("{:x}", hasher.finalize());

    let mut hasher = Md5::new();
    hasher.update(inner.as_bytes());
    hasher.update(salt);
    format!("md5{:x}", hasher.finalize())
}

#[cfg(test)]
mod test {
    use super::md5_password;

    #[test]
    fn md5_password_recipe() {
        assert_eq!(
            md5_password("u", "p", [1, 2, 3, 4]),
            "md5facdc455923b0a58efea84a6d9ee0e76",
        );
    }

    #[test]
    fn md5_password_shape() {
        let digest = md5_password("postgres", "password", [0xde, 0xad, 0xbe, 0xef]);
        assert!(digest.starts_with("md5"));
        assert_eq!(digest.len(), 35); // "md5" + 32 hex chars
        assert!(digest[3..].bytes().all(|b| b.is_ascii_hexdigit()));
    }
}
