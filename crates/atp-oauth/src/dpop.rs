// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_crypto::{b64, der, CryptoProvider, Jwk, KeyPair};
use atp_error::{Error, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Wire structs
// ---------------------------------------------------------------------------

// Field declaration order is lexicographic so serde_json emits the keys in
// the order the proof contract requires.

#[derive(Serialize)]
struct ProofHeader<'a> {
    alg: &'static str,
    jwk: PublicJwk<'a>,
    typ: &'static str,
}

#[derive(Serialize)]
struct PublicJwk<'a> {
    crv: &'a str,
    kty: &'a str,
    x: &'a str,
    y: &'a str,
}

#[derive(Serialize)]
struct ProofPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ath: Option<String>,
    htm: String,
    htu: String,
    iat: i64,
    jti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// DpopManager
// ---------------------------------------------------------------------------

/// Generates DPoP proof JWTs bound to a freshly generated P-256 key pair.
///
/// The manager owns the key pair for its whole lifetime and stores the most
/// recent server-provided nonce for inclusion in subsequent proofs.
pub struct DpopManager {
    crypto: Arc<dyn CryptoProvider>,
    key_pair: KeyPair,
    public_jwk: Jwk,
    server_nonce: RwLock<Option<String>>,
}

impl DpopManager {
    /// A manager with a freshly generated key pair.
    pub fn new(crypto: Arc<dyn CryptoProvider>) -> Result<Self> {
        let key_pair = crypto.generate_p256_keypair()?;
        let public_jwk = Jwk::from_public_key(&key_pair.public_key)?;
        Ok(Self {
            crypto,
            key_pair,
            public_jwk,
            server_nonce: RwLock::new(None),
        })
    }

    /// The public half of the bound key.
    pub fn public_jwk(&self) -> &Jwk {
        &self.public_jwk
    }

    /// The crypto provider this manager signs with.
    pub fn crypto_provider(&self) -> &dyn CryptoProvider {
        self.crypto.as_ref()
    }

    /// Store a server-provided nonce, replacing any previous value.
    pub fn update_nonce(&self, nonce: impl Into<String>) {
        *self.server_nonce.write().expect("nonce lock poisoned") = Some(nonce.into());
    }

    /// The currently stored server nonce.
    pub fn server_nonce(&self) -> Option<String> {
        self.server_nonce.read().expect("nonce lock poisoned").clone()
    }

    /// Generate a compact proof JWT for one request.
    ///
    /// `htm` is the upper-cased method; `htu` is the URL with query and
    /// fragment stripped; `ath` is included when an access token is bound.
    pub fn generate_proof(
        &self,
        method: &str,
        url: &str,
        access_token: Option<&str>,
    ) -> Result<String> {
        let htu = strip_query_and_fragment(url)?;
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let nonce = self.server_nonce();

        let header = ProofHeader {
            alg: "ES256",
            jwk: PublicJwk {
                crv: &self.public_jwk.crv,
                kty: &self.public_jwk.kty,
                x: &self.public_jwk.x,
                y: &self.public_jwk.y,
            },
            typ: "dpop+jwt",
        };
        let payload = ProofPayload {
            ath: access_token.map(|token| b64::encode(Sha256::digest(token.as_bytes()))),
            htm: method.to_ascii_uppercase(),
            htu,
            iat,
            jti: Uuid::new_v4().to_string(),
            nonce: nonce.as_deref(),
        };

        let header_json =
            serde_json::to_vec(&header).map_err(|e| Error::Encoding(e.to_string()))?;
        let payload_json =
            serde_json::to_vec(&payload).map_err(|e| Error::Encoding(e.to_string()))?;
        let signing_input = format!("{}.{}", b64::encode(header_json), b64::encode(payload_json));

        let der_signature = self
            .crypto
            .sign(signing_input.as_bytes(), &self.key_pair.private_key)?;
        let raw = der::signature_to_raw(&der_signature)?;
        Ok(format!("{signing_input}.{}", b64::encode(raw)))
    }
}

fn strip_query_and_fragment(url: &str) -> Result<String> {
    let mut parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
