//! Session token generation

use base64::prelude::*;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::prelude::Type;

/// Amount of random bytes in a session token (256 bits)
const TOKEN_BYTES: usize = 32;

/// Opaque session token, the bearer credential of a session
#[derive(Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generates a new token from OS entropy
    ///
    /// Tokens are not checked against existing ones, the unique constraint on the sessions table
    /// rejects a collision.
    pub fn generate() -> Self {
        let mut buffer = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut buffer);
        Self(BASE64_URL_SAFE_NO_PAD.encode(buffer))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for SessionToken {
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

// Tokens are credentials, keep them out of logs
impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_do_not_collide() {
        let tokens: HashSet<_> = (0..10_000).map(|_| SessionToken::generate()).collect();
        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn token_encodes_256_bits() {
        let token = SessionToken::generate();

        // 32 bytes in unpadded base64
        assert_eq!(token.as_str().len(), 43);
        let decoded = BASE64_URL_SAFE_NO_PAD.decode(token.as_str()).unwrap();
        assert_eq!(decoded.len(), TOKEN_BYTES);
    }

    #[test]
    fn token_is_cookie_and_header_safe() {
        let token = SessionToken::generate();
        assert!(
            token
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn debug_hides_token() {
        let token = SessionToken::from("secret");
        assert_eq!(format!("{token:?}"), "SessionToken(..)");
    }
}
