// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Did, Handle, Nsid};
use atp_error::Error;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// AtUriAuthority
// ---------------------------------------------------------------------------

/// The authority component of an AT-URI: a DID or a handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AtUriAuthority {
    /// A decentralized identifier.
    Did(Did),
    /// A domain-style handle.
    Handle(Handle),
}

impl AtUriAuthority {
    fn parse(s: &str) -> Option<Self> {
        if s.starts_with("did:") {
            Did::parse(s).map(Self::Did)
        } else {
            Handle::parse(s).map(Self::Handle)
        }
    }

    /// The authority as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Did(did) => did.as_str(),
            Self::Handle(handle) => handle.as_str(),
        }
    }
}

impl fmt::Display for AtUriAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AtUri
// ---------------------------------------------------------------------------

/// An AT-URI: `at://<authority>[/<collection>[/<rkey>]]`.
///
/// The authority is validated as a DID or handle, the collection (when
/// present) as an NSID. The record key is an opaque non-empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtUri {
    authority: AtUriAuthority,
    collection: Option<Nsid>,
    rkey: Option<String>,
}

impl AtUri {
    /// The URI scheme prefix.
    pub const SCHEME: &'static str = "at://";

    /// Construct from parts. A record key without a collection is invalid.
    pub fn new(
        authority: AtUriAuthority,
        collection: Option<Nsid>,
        rkey: Option<String>,
    ) -> Result<Self, Error> {
        if rkey.is_some() && collection.is_none() {
            return Err(Error::InvalidAtUri("rkey without collection".into()));
        }
        if let Some(ref rkey) = rkey {
            if rkey.is_empty() {
                return Err(Error::InvalidAtUri("empty rkey".into()));
            }
        }
        Ok(Self {
            authority,
            collection,
            rkey,
        })
    }

    /// Parse an AT-URI string, returning `None` when invalid.
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix(Self::SCHEME)?;
        let mut parts = rest.splitn(3, '/');
        let authority = AtUriAuthority::parse(parts.next()?)?;

        let collection = match parts.next() {
            None => None,
            Some("") => return None,
            Some(seg) => Some(Nsid::parse(seg)?),
        };
        let rkey = match parts.next() {
            None => None,
            Some("") => return None,
            Some(seg) => Some(seg.to_string()),
        };
        Some(Self {
            authority,
            collection,
            rkey,
        })
    }

    /// The authority component.
    pub fn authority(&self) -> &AtUriAuthority {
        &self.authority
    }

    /// The collection NSID, when present.
    pub fn collection(&self) -> Option<&Nsid> {
        self.collection.as_ref()
    }

    /// The record key, when present.
    pub fn rkey(&self) -> Option<&str> {
        self.rkey.as_deref()
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::SCHEME, self.authority)?;
        if let Some(ref collection) = self.collection {
            write!(f, "/{collection}")?;
        }
        if let Some(ref rkey) = self.rkey {
            write!(f, "/{rkey}")?;
        }
        Ok(())
    }
}

impl FromStr for AtUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidAtUri(s.to_string()))
    }
}

impl Serialize for AtUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AtUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
