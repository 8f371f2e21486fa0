use std::fmt;

use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::TypeError;

/// Number of leading characters of a durable ID that name its shard bucket.
pub const BUCKET_LEN: usize = 2;

/// Bytes of OS entropy mixed into every generated ID.
const RANDOM_BYTES: usize = 10;

/// Permanent identifier for a thread or an attachment.
///
/// Generated IDs pack a 48-bit millisecond timestamp (most significant first)
/// with 80 bits of OS randomness and encode the result as 26 characters of
/// Crockford base32. The alphabet is ASCII-ordered, so IDs minted at later
/// milliseconds always sort after earlier ones; IDs minted within the same
/// millisecond are ordered by their random suffix.
///
/// Once assigned, a `DurableId` never changes. Lookup treats it as opaque:
/// any ASCII-alphanumeric token of at least [`BUCKET_LEN`] characters is
/// accepted, which keeps IDs written by older encoders resolvable.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DurableId(String);

impl DurableId {
    /// Generate a fresh ID stamped with the current wall-clock time.
    pub fn generate() -> Result<Self, TypeError> {
        let now_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        Self::generate_at(now_ms)
    }

    /// Generate an ID for an explicit millisecond timestamp.
    ///
    /// Fails only if the operating system's randomness source fails.
    pub fn generate_at(timestamp_ms: u64) -> Result<Self, TypeError> {
        let mut entropy = [0u8; RANDOM_BYTES];
        rand::rngs::OsRng
            .try_fill_bytes(&mut entropy)
            .map_err(|e| TypeError::Entropy(e.to_string()))?;
        let random = entropy
            .iter()
            .fold(0u128, |acc, b| (acc << 8) | u128::from(*b));
        Ok(Self(Ulid::from_parts(timestamp_ms, random).to_string()))
    }

    /// Parse a user- or disk-supplied token as a durable ID.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.len() < BUCKET_LEN {
            return Err(TypeError::InvalidId {
                value: s.to_string(),
                reason: format!("must be at least {BUCKET_LEN} characters"),
            });
        }
        if let Some(ch) = s.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(TypeError::InvalidId {
                value: s.to_string(),
                reason: format!("contains forbidden character {ch:?}"),
            });
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The shard bucket: the first [`BUCKET_LEN`] characters.
    pub fn bucket(&self) -> &str {
        &self.0[..BUCKET_LEN]
    }

    /// Abbreviated form for tables (`01HV8Z…K3QW`).
    pub fn abbreviated(&self) -> String {
        abbreviate(&self.0)
    }
}

/// Shorten any identifier to its first 6 and last 4 characters. Identifiers
/// of 10 characters or fewer are returned whole.
pub fn abbreviate(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 10 {
        return id.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

impl TryFrom<String> for DurableId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DurableId> for String {
    fn from(id: DurableId) -> Self {
        id.0
    }
}

impl AsRef<str> for DurableId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DurableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DurableId({})", self.0)
    }
}

impl fmt::Display for DurableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
