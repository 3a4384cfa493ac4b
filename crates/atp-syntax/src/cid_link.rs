// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// CidLink
// ---------------------------------------------------------------------------

/// A content-address string in its JSON envelope form.
///
/// Serializes as the single-field map `{"$link": "<cid>"}`. Deserialization
/// also accepts a bare string. No structural validation is performed beyond
/// non-emptiness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CidLink(String);

impl CidLink {
    /// Wrap a CID string. Returns `None` for the empty string.
    pub fn new(cid: impl Into<String>) -> Option<Self> {
        let cid = cid.into();
        if cid.is_empty() {
            None
        } else {
            Some(Self(cid))
        }
    }

    /// The CID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CidLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for CidLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$link", &self.0)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for CidLink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LinkVisitor;

        impl<'de> Visitor<'de> for LinkVisitor {
            type Value = CidLink;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a CID string or a {\"$link\": ...} map")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CidLink, E> {
                CidLink::new(v).ok_or_else(|| E::custom("empty CID"))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<CidLink, A::Error> {
                let mut link: Option<String> = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key == "$link" {
                        link = Some(map.next_value()?);
                    } else {
                        return Err(de::Error::custom(format!(
                            "unexpected key {key:?} in CID link"
                        )));
                    }
                }
                let link = link.ok_or_else(|| de::Error::missing_field("$link"))?;
                CidLink::new(link).ok_or_else(|| de::Error::custom("empty CID"))
            }
        }

        deserializer.deserialize_any(LinkVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "bafyreidfayvfuwqa7qlnopdjiqrxzs6blmoeu4rujcjtnci5beludirz2a";

    #[test]
    fn serializes_as_link_map() {
        let link = CidLink::new(CID).unwrap();
        let json = serde_json::to_string(&link).unwrap();
        assert_eq!(json, format!(r#"{{"$link":"{CID}"}}"#));
    }

    #[test]
    fn decodes_from_link_map() {
        let json = format!(r#"{{"$link":"{CID}"}}"#);
        let link: CidLink = serde_json::from_str(&json).unwrap();
        assert_eq!(link.as_str(), CID);
    }

    #[test]
    fn decodes_from_bare_string() {
        let json = format!(r#""{CID}""#);
        let link: CidLink = serde_json::from_str(&json).unwrap();
        assert_eq!(link.as_str(), CID);
    }

    #[test]
    fn round_trips_through_envelope() {
        let link = CidLink::new(CID).unwrap();
        let json = serde_json::to_string(&link).unwrap();
        let back: CidLink = serde_json::from_str(&json).unwrap();
        assert_eq!(back, link);
    }

    #[test]
    fn rejects_empty() {
        assert!(CidLink::new("").is_none());
        assert!(serde_json::from_str::<CidLink>(r#""""#).is_err());
        assert!(serde_json::from_str::<CidLink>(r#"{"$link":""}"#).is_err());
    }

    #[test]
    fn rejects_foreign_keys() {
        assert!(serde_json::from_str::<CidLink>(r#"{"cid":"abc"}"#).is_err());
    }
}
