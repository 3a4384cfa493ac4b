// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_error::Error;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// DidMethod
// ---------------------------------------------------------------------------

/// The DID method families this SDK recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DidMethod {
    /// `did:plc` — directory-registered identifiers.
    Plc,
    /// `did:web` — domain-hosted identifiers.
    Web,
    /// `did:key` — self-certifying key identifiers.
    Key,
    /// Any other syntactically valid method.
    Other,
}

impl DidMethod {
    fn classify(method: &str) -> Self {
        match method {
            "plc" => Self::Plc,
            "web" => Self::Web,
            "key" => Self::Key,
            _ => Self::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// Did
// ---------------------------------------------------------------------------

/// A decentralized identifier of the form `did:<method>:<identifier>`.
///
/// The method must be lowercase alphanumeric and non-empty; the identifier
/// is everything after the second colon and may itself contain colons
/// (taken literally, as `did:web` requires).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Did {
    raw: String,
    method: DidMethod,
    // Byte offset of the method-specific identifier within `raw`.
    id_start: usize,
}

impl Did {
    /// Parse a DID, returning `None` when the input is not valid DID syntax.
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix("did:")?;
        let colon = rest.find(':')?;
        let method = &rest[..colon];
        let identifier = &rest[colon + 1..];
        if method.is_empty() || identifier.is_empty() {
            return None;
        }
        if !method
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return None;
        }
        Some(Self {
            raw: s.to_string(),
            method: DidMethod::classify(method),
            id_start: 4 + colon + 1,
        })
    }

    /// The method family of this DID.
    pub fn method(&self) -> DidMethod {
        self.method
    }

    /// The method name exactly as written (e.g. `"plc"`).
    pub fn method_name(&self) -> &str {
        &self.raw[4..self.id_start - 1]
    }

    /// The method-specific identifier (everything after the second colon).
    pub fn identifier(&self) -> &str {
        &self.raw[self.id_start..]
    }

    /// The full DID string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Did {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidDid(s.to_string()))
    }
}

impl Serialize for Did {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_methods() {
        let did = Did::parse("did:plc:z72i7hdynmk6r22z27h6tvur").unwrap();
        assert_eq!(did.method(), DidMethod::Plc);
        assert_eq!(did.method_name(), "plc");
        assert_eq!(did.identifier(), "z72i7hdynmk6r22z27h6tvur");

        assert_eq!(
            Did::parse("did:web:example.com").unwrap().method(),
            DidMethod::Web
        );
        assert_eq!(
            Did::parse("did:key:zDnaembgSGUhZULN2Caob4HLJPaxBh92N7rtH21TErzqf8HQo")
                .unwrap()
                .method(),
            DidMethod::Key
        );
    }

    #[test]
    fn unknown_method_tags_as_other() {
        let did = Did::parse("did:ion:EiClkZMDxPKqC9c").unwrap();
        assert_eq!(did.method(), DidMethod::Other);
        assert_eq!(did.method_name(), "ion");
    }

    #[test]
    fn identifier_keeps_further_colons() {
        let did = Did::parse("did:web:example.com:u:alice").unwrap();
        assert_eq!(did.identifier(), "example.com:u:alice");
    }

    #[test]
    fn rejects_malformed() {
        assert!(Did::parse("").is_none());
        assert!(Did::parse("did:").is_none());
        assert!(Did::parse("did::").is_none());
        assert!(Did::parse("did:plc").is_none());
        assert!(Did::parse("did:plc:").is_none());
        assert!(Did::parse("did::abc").is_none());
        assert!(Did::parse("plc:abc").is_none());
        assert!(Did::parse("did:PLC:abc").is_none());
        assert!(Did::parse("did:pl c:abc").is_none());
    }

    #[test]
    fn display_round_trips() {
        let s = "did:plc:abc123";
        assert_eq!(Did::parse(s).unwrap().to_string(), s);
    }

    #[test]
    fn serde_as_plain_string() {
        let did = Did::parse("did:plc:abc").unwrap();
        let json = serde_json::to_string(&did).unwrap();
        assert_eq!(json, r#""did:plc:abc""#);
        let back: Did = serde_json::from_str(&json).unwrap();
        assert_eq!(back, did);
    }

    #[test]
    fn serde_rejects_invalid() {
        assert!(serde_json::from_str::<Did>(r#""not-a-did""#).is_err());
    }
}
