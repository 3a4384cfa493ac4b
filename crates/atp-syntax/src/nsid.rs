// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_error::Error;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Nsid
// ---------------------------------------------------------------------------

/// A namespaced identifier in reverse-domain form, e.g.
/// `app.bsky.feed.post`.
///
/// At least three dot-separated segments. Authority segments (all but the
/// last) must start with a letter and may contain letters, digits, and
/// hyphens; the terminal name segment must start with a letter and contain
/// letters and digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nsid {
    raw: String,
    // Byte offset of the terminal name segment.
    name_start: usize,
}

impl Nsid {
    /// Maximum total length in characters.
    pub const MAX_LEN: usize = 317;
    /// Maximum length of a single segment.
    pub const MAX_SEGMENT_LEN: usize = 63;

    /// Parse an NSID, returning `None` when the input is not valid.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > Self::MAX_LEN {
            return None;
        }
        let segments: Vec<&str> = s.split('.').collect();
        if segments.len() < 3 {
            return None;
        }
        let (name, authority) = segments.split_last().expect("at least three segments");
        for seg in authority {
            if !valid_segment(seg, true) {
                return None;
            }
        }
        if !valid_segment(name, false) {
            return None;
        }
        Some(Self {
            raw: s.to_string(),
            name_start: s.len() - name.len(),
        })
    }

    /// The terminal name segment (e.g. `"post"`).
    pub fn name(&self) -> &str {
        &self.raw[self.name_start..]
    }

    /// The dotted authority — every segment but the last (e.g. `"app.bsky.feed"`).
    pub fn authority(&self) -> &str {
        &self.raw[..self.name_start - 1]
    }

    /// The full NSID string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn valid_segment(seg: &str, allow_hyphen: bool) -> bool {
    if seg.is_empty() || seg.len() > Nsid::MAX_SEGMENT_LEN {
        return false;
    }
    let mut bytes = seg.bytes();
    let first = bytes.next().expect("non-empty segment");
    if !first.is_ascii_alphabetic() {
        return false;
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || (allow_hyphen && b == b'-'))
}

impl fmt::Display for Nsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Nsid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidNsid(s.to_string()))
    }
}

impl Serialize for Nsid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Nsid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
