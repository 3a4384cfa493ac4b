// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_crypto::{b64, CryptoProvider};
use sha2::{Digest, Sha256};

/// The only challenge method this SDK emits.
pub const CHALLENGE_METHOD: &str = "S256";

/// Entropy behind a code verifier: 32 bytes, 43 base64url characters.
pub const VERIFIER_ENTROPY_BYTES: usize = 32;

/// Entropy behind a state parameter.
pub const STATE_ENTROPY_BYTES: usize = 16;

// ---------------------------------------------------------------------------
// Pkce
// ---------------------------------------------------------------------------

/// A PKCE verifier/challenge pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkce {
    /// The code verifier sent to the token endpoint.
    pub verifier: String,
    /// The S256 challenge sent with the authorization request.
    pub challenge: String,
}

/// Generate a fresh verifier and its challenge.
pub fn generate(crypto: &dyn CryptoProvider) -> Pkce {
    let verifier = b64::encode(crypto.generate_random_bytes(VERIFIER_ENTROPY_BYTES));
    let challenge = challenge(&verifier);
    Pkce {
        verifier,
        challenge,
    }
}

/// `base64url(SHA-256(verifier_ascii_bytes))` per RFC 7636.
pub fn challenge(verifier: &str) -> String {
    b64::encode(Sha256::digest(verifier.as_bytes()))
}

/// Generate a fresh `state` parameter.
pub fn generate_state(crypto: &dyn CryptoProvider) -> String {
    b64::encode(crypto.generate_random_bytes(STATE_ENTROPY_BYTES))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
