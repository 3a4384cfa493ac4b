// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_error::{Error, Result};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Length of a raw P-256 private scalar in bytes.
pub const PRIVATE_KEY_LEN: usize = 32;
/// Length of a compressed SEC1 P-256 public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 33;

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

/// A P-256 key pair: raw 32-byte scalar and compressed 33-byte public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// Raw private scalar, exactly 32 bytes.
    pub private_key: Vec<u8>,
    /// Compressed SEC1 public key, exactly 33 bytes.
    pub public_key: Vec<u8>,
}

// ---------------------------------------------------------------------------
// CryptoProvider
// ---------------------------------------------------------------------------

/// The narrow crypto capability the rest of the SDK depends on.
///
/// All operations are synchronous; none is a suspension point.
pub trait CryptoProvider: Send + Sync {
    /// Generate a fresh P-256 key pair.
    fn generate_p256_keypair(&self) -> Result<KeyPair>;

    /// ES256-sign `data` with a raw 32-byte private scalar, returning a
    /// DER-encoded ECDSA signature.
    fn sign(&self, data: &[u8], private_key: &[u8]) -> Result<Vec<u8>>;

    /// Verify a DER-encoded ECDSA signature against a compressed public key.
    ///
    /// A malformed signature verifies as `false`; malformed key material is
    /// an error.
    fn verify(&self, signature: &[u8], data: &[u8], public_key: &[u8]) -> Result<bool>;

    /// SHA-256 digest.
    fn sha256(&self, data: &[u8]) -> [u8; 32];

    /// `n` cryptographically secure random bytes.
    fn generate_random_bytes(&self, n: usize) -> Vec<u8>;
}

// ---------------------------------------------------------------------------
// P256Provider
// ---------------------------------------------------------------------------

/// Default [`CryptoProvider`] backed by the RustCrypto P-256 stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct P256Provider;

impl P256Provider {
    /// A new provider. Stateless; cheap to copy.
    pub fn new() -> Self {
        Self
    }
}

fn signing_key_from_raw(private_key: &[u8]) -> Result<SigningKey> {
    if private_key.len() != PRIVATE_KEY_LEN {
        return Err(Error::Crypto(format!(
            "private key must be {PRIVATE_KEY_LEN} bytes, got {}",
            private_key.len()
        )));
    }
    SigningKey::from_slice(private_key)
        .map_err(|_| Error::Crypto("private key is not a valid P-256 scalar".into()))
}

impl CryptoProvider for P256Provider {
    fn generate_p256_keypair(&self) -> Result<KeyPair> {
        let secret = SecretKey::random(&mut OsRng);
        let public = secret.public_key();
        Ok(KeyPair {
            private_key: secret.to_bytes().to_vec(),
            public_key: public.to_encoded_point(true).as_bytes().to_vec(),
        })
    }

    fn sign(&self, data: &[u8], private_key: &[u8]) -> Result<Vec<u8>> {
        let key = signing_key_from_raw(private_key)?;
        let signature: Signature = key.sign(data);
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn verify(&self, signature: &[u8], data: &[u8], public_key: &[u8]) -> Result<bool> {
        let key = VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|_| Error::Crypto("public key is not a valid SEC1 P-256 point".into()))?;
        let Ok(signature) = Signature::from_der(signature) else {
            return Ok(false);
        };
        Ok(key.verify(data, &signature).is_ok())
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }

    fn generate_random_bytes(&self, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        OsRng.fill_bytes(&mut out);
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
