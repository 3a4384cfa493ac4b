// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_error::{Error, Result};

/// Multicodec prefix for P-256 compressed public keys.
pub const P256_PREFIX: [u8; 2] = [0x80, 0x24];
/// Multicodec prefix for secp256k1 compressed public keys.
pub const SECP256K1_PREFIX: [u8; 2] = [0xe7, 0x01];

const DID_KEY_PREFIX: &str = "did:key:";
const BASE58_MARKER: char = 'z';

// ---------------------------------------------------------------------------
// KeyAlgorithm
// ---------------------------------------------------------------------------

/// Key algorithms representable as multikeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// NIST P-256 (secp256r1).
    P256,
    /// secp256k1.
    Secp256k1,
}

impl KeyAlgorithm {
    fn prefix(&self) -> [u8; 2] {
        match self {
            Self::P256 => P256_PREFIX,
            Self::Secp256k1 => SECP256K1_PREFIX,
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding / decoding
// ---------------------------------------------------------------------------

/// Encode a compressed public key as
/// `did:key:z<base58btc(multicodec_prefix ++ key)>`.
pub fn encode(algorithm: KeyAlgorithm, public_key: &[u8]) -> String {
    let mut payload = Vec::with_capacity(2 + public_key.len());
    payload.extend_from_slice(&algorithm.prefix());
    payload.extend_from_slice(public_key);
    format!(
        "{DID_KEY_PREFIX}{BASE58_MARKER}{}",
        bs58::encode(payload).into_string()
    )
}

/// Decode a multikey, with or without its `did:key:` prefix, into the
/// algorithm and the raw key bytes.
pub fn decode(multikey: &str) -> Result<(KeyAlgorithm, Vec<u8>)> {
    let encoded = multikey.strip_prefix(DID_KEY_PREFIX).unwrap_or(multikey);
    let encoded = encoded
        .strip_prefix(BASE58_MARKER)
        .ok_or_else(|| Error::Crypto("multikey missing base58btc marker".into()))?;

    let payload = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| Error::Crypto(format!("multikey base58: {e}")))?;
    if payload.len() < 2 {
        return Err(Error::Crypto("multikey payload too short".into()));
    }

    let (prefix, key) = payload.split_at(2);
    let algorithm = if prefix == P256_PREFIX {
        KeyAlgorithm::P256
    } else if prefix == SECP256K1_PREFIX {
        KeyAlgorithm::Secp256k1
    } else {
        return Err(Error::UnsupportedAlgorithm(format!(
            "unknown multicodec prefix {:02x}{:02x}",
            prefix[0], prefix[1]
        )));
    };
    Ok((algorithm, key.to_vec()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CryptoProvider, P256Provider};

    #[test]
    fn encodes_with_did_key_prefix_and_marker() {
        let pair = P256Provider::new().generate_p256_keypair().unwrap();
        let multikey = encode(KeyAlgorithm::P256, &pair.public_key);
        assert!(multikey.starts_with("did:key:z"));
    }

    #[test]
    fn round_trips_p256() {
        let pair = P256Provider::new().generate_p256_keypair().unwrap();
        let multikey = encode(KeyAlgorithm::P256, &pair.public_key);
        let (algorithm, key) = decode(&multikey).unwrap();
        assert_eq!(algorithm, KeyAlgorithm::P256);
        assert_eq!(key, pair.public_key);
    }

    #[test]
    fn round_trips_secp256k1_prefix() {
        let key = [0x02u8; 33];
        let multikey = encode(KeyAlgorithm::Secp256k1, &key);
        let (algorithm, decoded) = decode(&multikey).unwrap();
        assert_eq!(algorithm, KeyAlgorithm::Secp256k1);
        assert_eq!(decoded, key);
    }

    #[test]
    fn accepts_bare_multibase_form() {
        let pair = P256Provider::new().generate_p256_keypair().unwrap();
        let multikey = encode(KeyAlgorithm::P256, &pair.public_key);
        let bare = multikey.strip_prefix("did:key:").unwrap();
        let (algorithm, key) = decode(bare).unwrap();
        assert_eq!(algorithm, KeyAlgorithm::P256);
        assert_eq!(key, pair.public_key);
    }

    #[test]
    fn rejects_missing_marker() {
        let err = decode("did:key:abc").unwrap_err();
        assert!(matches!(err, Error::Crypto(_)));
    }

    #[test]
    fn rejects_unknown_prefix() {
        // ed25519 multicodec prefix 0xed 0x01.
        let mut payload = vec![0xed, 0x01];
        payload.extend_from_slice(&[0u8; 32]);
        let multikey = format!("did:key:z{}", bs58::encode(payload).into_string());
        let err = decode(&multikey).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn rejects_invalid_base58() {
        assert!(decode("did:key:z0OIl").is_err());
    }

    #[test]
    fn rejects_short_payload() {
        let multikey = format!("did:key:z{}", bs58::encode([0x80u8]).into_string());
        assert!(decode(&multikey).is_err());
    }
}
