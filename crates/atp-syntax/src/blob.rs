// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::CidLink;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// BlobRef
// ---------------------------------------------------------------------------

/// A reference to an uploaded blob.
///
/// The JSON form is `{"$type":"blob","ref":{"$link":...},"mimeType":...,
/// "size":...}`. Decoding tolerates a missing `$type` but rejects any value
/// other than `"blob"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    /// Content address of the blob bytes.
    pub r#ref: CidLink,
    /// Declared MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
}

#[derive(Serialize, Deserialize)]
struct BlobRefWire {
    #[serde(rename = "$type", skip_serializing_if = "Option::is_none")]
    type_tag: Option<String>,
    r#ref: CidLink,
    #[serde(rename = "mimeType")]
    mime_type: String,
    size: u64,
}

impl Serialize for BlobRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BlobRefWire {
            type_tag: Some("blob".to_string()),
            r#ref: self.r#ref.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BlobRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = BlobRefWire::deserialize(deserializer)?;
        if let Some(ref tag) = wire.type_tag {
            if tag != "blob" {
                return Err(D::Error::custom(format!(
                    "expected $type \"blob\", got {tag:?}"
                )));
            }
        }
        Ok(Self {
            r#ref: wire.r#ref,
            mime_type: wire.mime_type,
            size: wire.size,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
