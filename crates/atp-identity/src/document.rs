// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_syntax::Handle;
use serde::{Deserialize, Serialize};

/// Service type advertised by personal data servers.
pub const PDS_SERVICE_TYPE: &str = "AtprotoPersonalDataServer";
/// Service id advertised by personal data servers.
pub const PDS_SERVICE_ID: &str = "#atproto_pds";

// ---------------------------------------------------------------------------
// DidDocument
// ---------------------------------------------------------------------------

/// A resolved DID document, reduced to the fields this SDK consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDocument {
    /// The document subject (the DID itself).
    pub id: String,
    /// Alias URIs, including `at://<handle>` entries.
    #[serde(default, rename = "alsoKnownAs")]
    pub also_known_as: Vec<String>,
    /// Declared verification methods.
    #[serde(default, rename = "verificationMethod")]
    pub verification_method: Vec<VerificationMethod>,
    /// Declared service endpoints.
    #[serde(default)]
    pub service: Vec<ServiceEntry>,
}

/// A verification method entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMethod {
    /// Method id, e.g. `did:plc:abc#atproto`.
    pub id: String,
    /// Method type.
    #[serde(rename = "type")]
    pub method_type: String,
    /// Controlling DID.
    pub controller: String,
    /// Multibase-encoded public key, when present.
    #[serde(rename = "publicKeyMultibase", skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
}

/// A service entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Service id, e.g. `#atproto_pds`.
    pub id: String,
    /// Service type.
    #[serde(rename = "type")]
    pub service_type: String,
    /// Endpoint URL.
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

impl DidDocument {
    /// The first `at://` alias parsed as a handle.
    pub fn handle(&self) -> Option<Handle> {
        self.also_known_as
            .iter()
            .find_map(|aka| Handle::parse(aka.strip_prefix("at://")?))
    }

    /// The PDS endpoint: the first service with the PDS type AND id.
    pub fn pds_endpoint(&self) -> Option<&str> {
        self.service
            .iter()
            .find(|s| s.service_type == PDS_SERVICE_TYPE && s.id == PDS_SERVICE_ID)
            .map(|s| s.service_endpoint.as_str())
    }

    /// The `#atproto` signing key entry, when declared.
    pub fn signing_key(&self) -> Option<&VerificationMethod> {
        self.verification_method
            .iter()
            .find(|m| m.id.ends_with("#atproto"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
