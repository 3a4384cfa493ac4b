// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::b64;
use atp_error::{Error, Result};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Jwk
// ---------------------------------------------------------------------------

/// An EC-flavored JSON Web Key.
///
/// Coordinates are base64url without padding. The optional `d` field holds
/// the private scalar; everything else is public.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, `"EC"` for this SDK.
    pub kty: String,
    /// Curve name, `"P-256"`.
    pub crv: String,
    /// X coordinate, base64url.
    pub x: String,
    /// Y coordinate, base64url.
    pub y: String,
    /// Private scalar, base64url. Present only for private keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Intended use (`"sig"`).
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub r#use: Option<String>,
    /// Algorithm (`"ES256"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

impl Jwk {
    /// Build a private JWK (x, y, and d) from a raw 32-byte P-256 scalar.
    pub fn from_private_key(private_key: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(private_key)
            .map_err(|_| Error::Crypto("invalid P-256 private key".into()))?;
        let mut jwk = Self::from_p256(&secret.public_key());
        jwk.d = Some(b64::encode(secret.to_bytes()));
        Ok(jwk)
    }

    /// Build a public JWK from a compressed 33-byte SEC1 public key.
    pub fn from_public_key(public_key: &[u8]) -> Result<Self> {
        let public = PublicKey::from_sec1_bytes(public_key)
            .map_err(|_| Error::Crypto("invalid P-256 public key".into()))?;
        Ok(Self::from_p256(&public))
    }

    fn from_p256(public: &PublicKey) -> Self {
        // The uncompressed SEC1 form is 0x04 || X (32 bytes) || Y (32 bytes).
        let point = public.to_encoded_point(false);
        let bytes = point.as_bytes();
        Self {
            kty: "EC".into(),
            crv: "P-256".into(),
            x: b64::encode(&bytes[1..33]),
            y: b64::encode(&bytes[33..65]),
            d: None,
            kid: None,
            r#use: None,
            alg: Some("ES256".into()),
        }
    }

    /// A copy of this key with `d` removed.
    pub fn to_public(&self) -> Self {
        Self {
            d: None,
            ..self.clone()
        }
    }

    /// RFC 7638 thumbprint: SHA-256 of the canonical JSON
    /// `{"crv":...,"kty":...,"x":...,"y":...}` with keys in lexicographic
    /// order, base64url-encoded.
    pub fn thumbprint(&self) -> Result<String> {
        if self.kty != "EC" {
            return Err(Error::Crypto(format!(
                "thumbprint unsupported for kty {:?}",
                self.kty
            )));
        }
        let canonical = format!(
            r#"{{"crv":"{}","kty":"{}","x":"{}","y":"{}"}}"#,
            self.crv, self.kty, self.x, self.y
        );
        Ok(b64::encode(Sha256::digest(canonical.as_bytes())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CryptoProvider, P256Provider};

    #[test]
    fn private_jwk_has_all_coordinates() {
        let pair = P256Provider::new().generate_p256_keypair().unwrap();
        let jwk = Jwk::from_private_key(&pair.private_key).unwrap();
        assert_eq!(jwk.kty, "EC");
        assert_eq!(jwk.crv, "P-256");
        assert_eq!(jwk.alg.as_deref(), Some("ES256"));
        assert!(jwk.d.is_some());
        // 32 bytes -> 43 base64url chars.
        assert_eq!(jwk.x.len(), 43);
        assert_eq!(jwk.y.len(), 43);
        assert_eq!(jwk.d.as_ref().unwrap().len(), 43);
    }

    #[test]
    fn public_jwk_has_no_private_scalar() {
        let pair = P256Provider::new().generate_p256_keypair().unwrap();
        let jwk = Jwk::from_public_key(&pair.public_key).unwrap();
        assert!(jwk.d.is_none());
    }

    #[test]
    fn private_and_public_forms_agree() {
        let pair = P256Provider::new().generate_p256_keypair().unwrap();
        let private = Jwk::from_private_key(&pair.private_key).unwrap();
        let public = Jwk::from_public_key(&pair.public_key).unwrap();
        assert_eq!(private.x, public.x);
        assert_eq!(private.y, public.y);
        assert_eq!(private.to_public(), public);
    }

    #[test]
    fn thumbprint_is_43_chars_and_deterministic() {
        let pair = P256Provider::new().generate_p256_keypair().unwrap();
        let jwk = Jwk::from_private_key(&pair.private_key).unwrap();
        let a = jwk.thumbprint().unwrap();
        let b = jwk.thumbprint().unwrap();
        assert_eq!(a.len(), 43);
        assert_eq!(a, b);
    }

    #[test]
    fn thumbprint_distinct_across_keys() {
        let provider = P256Provider::new();
        let a = Jwk::from_private_key(&provider.generate_p256_keypair().unwrap().private_key)
            .unwrap();
        let b = Jwk::from_private_key(&provider.generate_p256_keypair().unwrap().private_key)
            .unwrap();
        assert_ne!(a.thumbprint().unwrap(), b.thumbprint().unwrap());
    }

    #[test]
    fn thumbprint_ignores_private_scalar() {
        let pair = P256Provider::new().generate_p256_keypair().unwrap();
        let private = Jwk::from_private_key(&pair.private_key).unwrap();
        let public = Jwk::from_public_key(&pair.public_key).unwrap();
        assert_eq!(private.thumbprint().unwrap(), public.thumbprint().unwrap());
    }

    #[test]
    fn thumbprint_rejects_non_ec() {
        let mut jwk = Jwk::from_private_key(
            &P256Provider::new().generate_p256_keypair().unwrap().private_key,
        )
        .unwrap();
        jwk.kty = "RSA".into();
        assert!(matches!(jwk.thumbprint(), Err(Error::Crypto(_))));
    }

    #[test]
    fn serde_skips_absent_fields() {
        let pair = P256Provider::new().generate_p256_keypair().unwrap();
        let jwk = Jwk::from_public_key(&pair.public_key).unwrap();
        let json = serde_json::to_string(&jwk).unwrap();
        assert!(!json.contains("\"d\""));
        assert!(!json.contains("kid"));
        let back: Jwk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, jwk);
    }

    #[test]
    fn rfc7638_appendix_vector_shape() {
        // Not the RSA vector from the RFC (we are EC-only); assert the
        // canonical-order property instead: thumbprint changes when x does.
        let pair = P256Provider::new().generate_p256_keypair().unwrap();
        let jwk = Jwk::from_public_key(&pair.public_key).unwrap();
        let mut altered = jwk.clone();
        altered.x = jwk.y.clone();
        assert_ne!(jwk.thumbprint().unwrap(), altered.thumbprint().unwrap());
    }
}
