//! Strongly-typed migration version identifier.

use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// Identifier of a migration unit, e.g. `20240101093000_create_users`.
///
/// The token is a run of ASCII digits (normally a `YYYYMMDDHHMMSS` timestamp),
/// optionally followed by `_` and a label. Ordering is plain lexicographic
/// order of the whole token, which matches the order a directory listing
/// sorts in, so fixed-width timestamps generated later always sort after
/// earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VersionIdentifier(String);

impl VersionIdentifier {
    /// Parse and validate a raw identifier token.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let invalid = |reason: &str| CoreError::InvalidVersion {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("identifier is empty"));
        }

        let digits = raw.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(invalid("identifier must start with a numeric timestamp"));
        }

        let rest = &raw[digits..];
        if !rest.is_empty() {
            let Some(label) = rest.strip_prefix('_') else {
                return Err(invalid("timestamp must be followed by '_' and a label"));
            };
            if label.is_empty() {
                return Err(invalid("label after '_' is empty"));
            }
            if let Some(bad) = label
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
            {
                return Err(invalid(&format!("label contains invalid character '{bad}'")));
            }
        }

        Ok(Self(raw.to_string()))
    }

    /// Leading numeric part of the identifier.
    pub fn timestamp(&self) -> &str {
        let digits = self.0.bytes().take_while(u8::is_ascii_digit).count();
        &self.0[..digits]
    }

    /// Label following the timestamp, if any.
    pub fn label(&self) -> Option<&str> {
        self.0[self.timestamp().len()..].strip_prefix('_')
    }

    /// Return the underlying token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> serde::Deserialize<'de> for VersionIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        VersionIdentifier::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl FromStr for VersionIdentifier {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for VersionIdentifier {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for VersionIdentifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for VersionIdentifier {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for VersionIdentifier {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
