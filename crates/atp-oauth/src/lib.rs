// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// The OAuth client driving the full flow.
pub mod client;
/// Authorization-server metadata discovery.
pub mod discovery;
/// DPoP proof generation.
pub mod dpop;
/// Form-encoded body rendering.
pub mod form;
/// PKCE verifier/challenge generation.
pub mod pkce;
/// Session state projection.
pub mod session;
/// Token lifecycle and secure storage.
pub mod tokens;

pub use client::{OAuthClient, OAuthConfig};
pub use discovery::{AuthServerDiscovery, AuthorizationServerMetadata};
pub use dpop::DpopManager;
pub use pkce::Pkce;
pub use session::OAuthSession;
pub use tokens::{
    MemorySecureStorage, SecureStorage, TokenManager, TokenSet, REFRESH_WINDOW_SECS,
};
