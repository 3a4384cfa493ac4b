// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// The single error sum type emitted by every subsystem of the SDK.
///
/// Variants are grouped by family. The `Display` output of each variant is
/// stable and considered part of the public contract; callers match on the
/// variant, log the formatted message.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // -- Validation --
    /// A string failed DID syntax validation.
    #[error("invalid DID: {0}")]
    InvalidDid(String),
    /// A string failed handle syntax validation.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
    /// A string failed NSID syntax validation.
    #[error("invalid NSID: {0}")]
    InvalidNsid(String),
    /// A string failed AT-URI syntax validation.
    #[error("invalid AT-URI: {0}")]
    InvalidAtUri(String),
    /// A string failed TID syntax validation.
    #[error("invalid TID: {0}")]
    InvalidTid(String),

    // -- Transport --
    /// The underlying transport failed before an HTTP status was available.
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The request exceeded its deadline.
    #[error("request timed out")]
    Timeout,
    /// A URL could not be constructed or parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    // -- RPC --
    /// Non-success XRPC response, with whatever the body disclosed.
    #[error("XRPC error {status}: {}: {}", error.as_deref().unwrap_or("Unknown"), message.as_deref().unwrap_or(""))]
    Xrpc {
        /// HTTP status code.
        status: u16,
        /// The `error` field of the response body, when parseable.
        error: Option<String>,
        /// The `message` field of the response body, when parseable.
        message: Option<String>,
    },
    /// The response was structurally unusable (e.g. empty where a body was required).
    #[error("invalid response")]
    InvalidResponse,
    /// A success body failed to decode into the expected type.
    #[error("decoding error: {0}")]
    Decoding(String),
    /// A request body failed to encode.
    #[error("encoding error: {0}")]
    Encoding(String),

    // -- Auth --
    /// 401 without an `ExpiredToken` body.
    #[error("unauthorized")]
    Unauthorized,
    /// 401 whose body said `ExpiredToken`.
    #[error("access token expired")]
    TokenExpired,
    /// A token refresh could not be performed or was rejected.
    #[error("token refresh failed: {0}")]
    TokenRefreshFailed(String),
    /// An OAuth error response (`error` + optional description/uri).
    #[error("OAuth error {error}: {}", description.as_deref().unwrap_or(""))]
    OAuth {
        /// The OAuth `error` code.
        error: String,
        /// Optional `error_description`.
        description: Option<String>,
        /// Optional `error_uri`.
        uri: Option<String>,
    },
    /// An operation required an authenticated session and none was present.
    #[error("session required")]
    SessionRequired,

    // -- Identity --
    /// DID resolution failed.
    #[error("DID resolution failed: {0}")]
    DidResolution(String),
    /// Handle resolution failed.
    #[error("handle resolution failed: {0}")]
    HandleResolution(String),
    /// No personal data server was discoverable for the subject.
    #[error("PDS not found: {0}")]
    PdsNotFound(String),

    // -- Repository --
    /// A record payload was structurally invalid.
    #[error("invalid record")]
    InvalidRecord,
    /// A record was absent at the given collection/rkey.
    #[error("record not found: {collection}/{rkey}")]
    RecordNotFound {
        /// Collection NSID.
        collection: String,
        /// Record key.
        rkey: String,
    },
    /// A repository-level structural failure (CAR framing, block access).
    #[error("repository error: {0}")]
    Repository(String),
    /// A Merkle Search Tree node failed to decode or traverse.
    #[error("MST error: {0}")]
    Mst(String),

    // -- Crypto --
    /// Key material or a primitive operation was invalid.
    #[error("crypto error: {0}")]
    Crypto(String),
    /// A signature failed structural parsing.
    #[error("invalid signature")]
    InvalidSignature,
    /// Key or signature algorithm outside the supported set.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    // -- Stream --
    /// The event stream connection closed.
    #[error("connection closed{}", reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    ConnectionClosed {
        /// Server-supplied reason, when one was transmitted.
        reason: Option<String>,
    },
    /// A binary frame could not be decoded into an event.
    #[error("frame decoding error: {0}")]
    FrameDecoding(String),

    // -- Other --
    /// Invariant violation inside the SDK itself.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for [`Error::ConnectionClosed`] with a reason.
    pub fn connection_closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: Some(reason.into()),
        }
    }

    /// Wrap an arbitrary transport failure as [`Error::Network`].
    pub fn network(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Network(Box::new(source))
    }

    /// True for the variants produced by identifier validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidDid(_)
                | Self::InvalidHandle(_)
                | Self::InvalidNsid(_)
                | Self::InvalidAtUri(_)
                | Self::InvalidTid(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn xrpc_display_with_body_fields() {
        let err = Error::Xrpc {
            status: 400,
            error: Some("InvalidRequest".into()),
            message: Some("bad params".into()),
        };
        assert_eq!(err.to_string(), "XRPC error 400: InvalidRequest: bad params");
    }

    #[test]
    fn xrpc_display_without_body_fields() {
        let err = Error::Xrpc {
            status: 500,
            error: None,
            message: None,
        };
        assert_eq!(err.to_string(), "XRPC error 500: Unknown: ");
    }

    #[test]
    fn oauth_display() {
        let err = Error::OAuth {
            error: "invalid_state".into(),
            description: Some("state mismatch".into()),
            uri: None,
        };
        assert_eq!(err.to_string(), "OAuth error invalid_state: state mismatch");
    }

    #[test]
    fn connection_closed_display() {
        assert_eq!(
            Error::ConnectionClosed { reason: None }.to_string(),
            "connection closed"
        );
        assert_eq!(
            Error::connection_closed("going away").to_string(),
            "connection closed: going away"
        );
    }

    #[test]
    fn network_preserves_source() {
        let err = Error::network(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(err.to_string(), "network error: reset");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn record_not_found_display() {
        let err = Error::RecordNotFound {
            collection: "app.bsky.feed.post".into(),
            rkey: "3jx".into(),
        };
        assert_eq!(err.to_string(), "record not found: app.bsky.feed.post/3jx");
    }

    #[test]
    fn validation_family() {
        assert!(Error::InvalidDid("x".into()).is_validation());
        assert!(Error::InvalidTid("x".into()).is_validation());
        assert!(!Error::Timeout.is_validation());
    }

    #[test]
    fn timeout_display() {
        assert_eq!(Error::Timeout.to_string(), "request timed out");
    }

    #[test]
    fn token_family_displays() {
        assert_eq!(Error::TokenExpired.to_string(), "access token expired");
        assert_eq!(Error::Unauthorized.to_string(), "unauthorized");
        assert_eq!(
            Error::TokenRefreshFailed("no refresh token".into()).to_string(),
            "token refresh failed: no refresh token"
        );
    }
}
