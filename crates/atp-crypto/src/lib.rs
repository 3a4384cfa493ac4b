// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Padding-free base64url encoding and decoding.
pub mod b64;
/// DER-encoded ECDSA signature parsing.
pub mod der;
/// JSON Web Key representation and thumbprints.
pub mod jwk;
/// Multikey (`did:key`) encoding and decoding.
pub mod multikey;
/// The crypto capability trait and its P-256 implementation.
pub mod provider;

pub use jwk::Jwk;
pub use multikey::KeyAlgorithm;
pub use provider::{CryptoProvider, KeyPair, P256Provider};
