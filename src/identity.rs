//! User identity: login validation and the filesystem-safe token each
//! persisted record is keyed by.

use std::fmt;

use thiserror::Error;

/// Reasons a login key is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("user id is empty")]
    Empty,
    #[error("`{0}` is not an email address")]
    NotAnEmail(String),
}

/// A validated user identity.
///
/// Holds the trimmed, lower-cased email plus the derived storage
/// token.  Two identities are equal when their emails are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    email: String,
    token: String,
}

impl Identity {
    /// Validate `raw` as an email address and build the identity.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let email = raw.trim().to_lowercase();
        if email.is_empty() {
            return Err(IdentityError::Empty);
        }
        if !looks_like_email(&email) {
            return Err(IdentityError::NotAnEmail(raw.trim().to_string()));
        }
        let token = storage_token(&email);
        Ok(Self { email, token })
    }

    /// The normalised email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Filesystem-safe token (`bruce@wayne.com` → `bruce_at_wayne.com`).
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

fn looks_like_email(s: &str) -> bool {
    let mut parts = s.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || s.chars().any(char::is_whitespace) {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Reversible escape of `email` into a file stem.
///
/// `[a-z0-9.-]` pass through, `_` doubles to `__`, `@` becomes `_at_`
/// and every other byte (and a leading `.`) becomes `_xHH`.  Every
/// escape starts with `_`, so distinct emails never share a token.
fn storage_token(email: &str) -> String {
    let mut token = String::with_capacity(email.len() + 8);
    for (i, byte) in email.bytes().enumerate() {
        match byte {
            b'_' => token.push_str("__"),
            b'@' => token.push_str("_at_"),
            b'.' if i == 0 => token.push_str("_x2e"),
            b if b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-' => {
                token.push(char::from(b))
            }
            b => token.push_str(&format!("_x{b:02x}")),
        }
    }
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalises() {
        let id = Identity::parse("  Bruce@Wayne.com ").unwrap();
        assert_eq!(id.email(), "bruce@wayne.com");
        assert_eq!(id.token(), "bruce_at_wayne.com");
        assert_eq!(id.to_string(), "bruce@wayne.com");
    }

    #[test]
    fn token_strips_path_characters() {
        let id = Identity::parse("a/../b+tag@x.io").unwrap();
        assert!(!id.token().contains('/'));
        assert_eq!(id.token(), "a_x2f.._x2fb_x2btag_at_x.io");

        let hidden = Identity::parse(".bruce@wayne.com").unwrap();
        assert!(!hidden.token().starts_with('.'));
    }

    #[test]
    fn similar_emails_get_distinct_tokens() {
        let emails = [
            "bruce.wayne@x.io",
            "bruce_wayne@x.io",
            "bruce-wayne@x.io",
            "bruce+wayne@x.io",
            "bruce_x2bwayne@x.io",
            "bruce_at_wayne@x.io",
        ];
        let tokens: std::collections::HashSet<String> = emails
            .iter()
            .map(|e| Identity::parse(e).unwrap().token().to_string())
            .collect();
        assert_eq!(tokens.len(), emails.len(), "{tokens:?}");
    }

    #[test]
    fn rejects_bad_keys() {
        assert_eq!(Identity::parse("   "), Err(IdentityError::Empty));
        assert!(matches!(
            Identity::parse("no-at-sign"),
            Err(IdentityError::NotAnEmail(_))
        ));
        assert!(Identity::parse("@wayne.com").is_err());
        assert!(Identity::parse("bruce@wayne").is_err());
        assert!(Identity::parse("bruce@.com").is_err());
        assert!(Identity::parse("a@b@c.com").is_err());
        assert!(Identity::parse("bru ce@wayne.com").is_err());
    }
}
