//! Object identity
//!
//! An [`Identity`] names one logical domain-object instance. It combines a
//! type discriminator, a key, and a transient/persistent flag. All three take
//! part in equality, so a transient identity and the persistent identity it is
//! later remapped to are distinct map keys.
//!
//! ## String form
//!
//! ```text
//! Customer:42        persistent, numeric key
//! Customer:acme-01   persistent, string key
//! Customer:~3        transient
//! ```
//!
//! The form is injective. Type names and string keys are percent-encoded,
//! so `:` inside either never splits the form. A string key that would read
//! as a number or start with the transient marker has its first character
//! encoded too: `Str("42")` renders as `%342`, `Str("~x")` as `%7Ex`. An
//! unencoded run of ASCII digits is always a numeric key.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

const TRANSIENT_MARKER: char = '~';

/// Primary-key representation of an identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentityKey {
    /// Numeric key (sequence-allocated)
    Num(u64),
    /// String key (uuid or natural key)
    Str(String),
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Num(n) => write!(f, "{}", n),
            IdentityKey::Str(s) => f.write_str(&encode_str_key(s)),
        }
    }
}

fn encode_str_key(key: &str) -> Cow<'_, str> {
    let encoded = urlencoding::encode(key);
    let ambiguous = encoded.starts_with(TRANSIENT_MARKER)
        || (!encoded.is_empty() && encoded.bytes().all(|b| b.is_ascii_digit()));
    if !ambiguous {
        return encoded;
    }
    let mut chars = encoded.chars();
    match chars.next() {
        Some(first) => Cow::Owned(format!("%{:02X}{}", first as u32, chars.as_str())),
        None => encoded,
    }
}

fn decode(raw: &str) -> Option<String> {
    urlencoding::decode(raw).ok().map(Cow::into_owned)
}

impl From<u64> for IdentityKey {
    fn from(n: u64) -> Self {
        IdentityKey::Num(n)
    }
}

impl From<String> for IdentityKey {
    fn from(s: String) -> Self {
        IdentityKey::Str(s)
    }
}

impl From<&str> for IdentityKey {
    fn from(s: &str) -> Self {
        IdentityKey::Str(s.to_string())
    }
}

/// Whether an identity has been made persistent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentityState {
    /// Allocated in memory, not yet known to storage
    Transient,
    /// Known to storage
    Persistent,
}

/// Immutable identity of one logical domain object
///
/// Created by an identity generator; never mutated. A transient identity is
/// replaced (not changed) by a persistent one when its adapter is remapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    type_name: String,
    key: IdentityKey,
    state: IdentityState,
}

impl Identity {
    /// Create a transient identity
    pub fn transient(type_name: impl Into<String>, key: impl Into<IdentityKey>) -> Self {
        Self {
            type_name: type_name.into(),
            key: key.into(),
            state: IdentityState::Transient,
        }
    }

    /// Create a persistent identity
    pub fn persistent(type_name: impl Into<String>, key: impl Into<IdentityKey>) -> Self {
        Self {
            type_name: type_name.into(),
            key: key.into(),
            state: IdentityState::Persistent,
        }
    }

    /// Type discriminator
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Key representation
    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    /// Transient/persistent flag
    pub fn state(&self) -> IdentityState {
        self.state
    }

    /// True if not yet persisted
    pub fn is_transient(&self) -> bool {
        self.state == IdentityState::Transient
    }

    /// True if known to storage
    pub fn is_persistent(&self) -> bool {
        self.state == IdentityState::Persistent
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_name = urlencoding::encode(&self.type_name);
        match self.state {
            IdentityState::Transient => {
                write!(f, "{}:{}{}", type_name, TRANSIENT_MARKER, self.key)
            }
            IdentityState::Persistent => write!(f, "{}:{}", type_name, self.key),
        }
    }
}

impl FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidIdentity(s.to_string());

        let (raw_type, rest) = s.split_once(':').ok_or_else(invalid)?;
        let type_name = decode(raw_type).ok_or_else(invalid)?;
        if type_name.is_empty() {
            return Err(invalid());
        }

        let (state, raw_key) = match rest.strip_prefix(TRANSIENT_MARKER) {
            Some(k) => (IdentityState::Transient, k),
            None => (IdentityState::Persistent, rest),
        };
        if raw_key.is_empty() {
            return Err(invalid());
        }

        let key = if raw_key.bytes().all(|b| b.is_ascii_digit()) {
            raw_key.parse::<u64>().map(IdentityKey::Num).map_err(|_| invalid())?
        } else {
            IdentityKey::Str(decode(raw_key).ok_or_else(invalid)?)
        };

        Ok(Self {
            type_name,
            key,
            state,
        })
    }
}
