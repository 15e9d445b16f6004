//! Challenge response login.
//!
//! Right after the transport is established the server sends a challenge:
//!
//! ```text
//! <salt>:<server>:<protocol>:<hashes>:<endian>:<password hash>:
//! ```
//!
//! The client answers with a single line containing the salted password digest:
//!
//! ```text
//! LIT:<user>:{SHA512}<digest>:<language>:<database>:
//! ```
//!
//! where `digest = sha512(sha512(password) + salt)`, both in lowercase hex.
use sha2::{Digest, Sha512};

/// Login challenge sent by the server.
#[derive(Debug, PartialEq, Eq)]
pub struct Challenge<'a> {
    /// Salt for the password digest.
    pub salt: &'a str,
    /// Server database identifier.
    pub server: &'a str,
}

impl<'a> Challenge<'a> {
    /// Parse colon separated challenge.
    pub fn parse(message: &'a str) -> Challenge<'a> {
        let mut fields = message.split(':');
        Self {
            salt: fields.next().unwrap_or_default(),
            server: fields.next().unwrap_or_default(),
        }
    }
}

/// Credentials needed to answer a [`Challenge`].
#[derive(Debug, Clone, Copy)]
pub struct Login<'a> {
    pub user: &'a str,
    pub password: &'a str,
    pub language: &'a str,
    pub database: &'a str,
}

impl Login<'_> {
    /// Build the response line for given challenge.
    pub fn respond(&self, challenge: &Challenge) -> String {
        format!(
            "LIT:{}:{{SHA512}}{}:{}:{}:",
            self.user,
            password_digest(self.password, challenge.salt),
            self.language,
            self.database,
        )
    }
}

/// `sha512(input)` as lowercase hex.
pub fn sha512(input: &[u8]) -> String {
    hex::encode(Sha512::digest(input))
}

/// `sha512(sha512(password) + salt)` as lowercase hex.
pub fn password_digest(password: &str, salt: &str) -> String {
    let mut salted = sha512(password.as_bytes());
    salted.push_str(salt);
    sha512(salted.as_bytes())
}
