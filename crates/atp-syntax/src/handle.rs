// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_error::Error;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A domain-style handle, case-normalized to lowercase on ingest.
///
/// Equality and hashing operate on the normalized form, so two handles
/// constructed from differently-cased inputs compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    normalized: String,
}

impl Handle {
    /// Maximum total length in characters.
    pub const MAX_LEN: usize = 253;
    /// Maximum length of a single label.
    pub const MAX_LABEL_LEN: usize = 63;

    /// Parse a handle, returning `None` when the input is not valid.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > Self::MAX_LEN {
            return None;
        }
        let normalized = s.to_ascii_lowercase();
        let labels: Vec<&str> = normalized.split('.').collect();
        if labels.len() < 2 {
            return None;
        }
        for label in &labels {
            if !valid_label(label) {
                return None;
            }
        }
        // The top-level label must not be all digits.
        let tld = labels.last().expect("at least two labels");
        if tld.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self { normalized })
    }

    /// The normalized (lowercase) handle string.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// The top-level label (the last dot-separated segment).
    pub fn tld(&self) -> &str {
        self.normalized
            .rsplit('.')
            .next()
            .expect("validated handle has labels")
    }
}

fn valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > Handle::MAX_LABEL_LEN {
        return false;
    }
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }
    label
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

impl FromStr for Handle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidHandle(s.to_string()))
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.normalized)
    }
}

impl<'de> Deserialize<'de> for Handle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
