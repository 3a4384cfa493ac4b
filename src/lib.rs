// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub use atp_crypto as crypto;
pub use atp_error as error;
pub use atp_firehose as firehose;
pub use atp_http as http;
pub use atp_identity as identity;
pub use atp_oauth as oauth;
pub use atp_repo as repo;
pub use atp_syntax as syntax;
pub use atp_xrpc as xrpc;

pub use atp_error::{Error, Result};

/// Default PLC directory base URL.
pub const DEFAULT_PLC_DIRECTORY_URL: &str = "https://plc.directory";
/// Default relay (firehose) endpoint.
pub const DEFAULT_RELAY_URL: &str = "wss://bsky.network";
/// Default identifier scoping persisted token blobs.
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "atproto-sdk.tokens";

// ---------------------------------------------------------------------------
// AtpConfig
// ---------------------------------------------------------------------------

/// Construction-time configuration for an SDK instance.
///
/// There is no global state: every option is explicit here, and the
/// defaults are the named constants above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtpConfig {
    /// Base URL for XRPC endpoints.
    pub service_url: String,
    /// OAuth client identifier (a URL), when OAuth is used.
    pub client_id: Option<String>,
    /// OAuth redirect URI, when OAuth is used.
    pub redirect_uri: Option<String>,
    /// Base URL for PLC resolution.
    pub plc_directory_url: String,
    /// WebSocket firehose endpoint.
    pub relay_url: String,
    /// Identifier used to scope persisted token blobs.
    pub keychain_service: String,
}

impl AtpConfig {
    /// A configuration for `service_url` with every default applied.
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            client_id: None,
            redirect_uri: None,
            plc_directory_url: DEFAULT_PLC_DIRECTORY_URL.to_string(),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
        }
    }

    /// Set the OAuth client id and redirect URI together.
    pub fn with_oauth(
        mut self,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Override the PLC directory.
    pub fn with_plc_directory(mut self, url: impl Into<String>) -> Self {
        self.plc_directory_url = url.into();
        self
    }

    /// Override the relay endpoint.
    pub fn with_relay(mut self, url: impl Into<String>) -> Self {
        self.relay_url = url.into();
        self
    }

    /// Override the keychain scope.
    pub fn with_keychain_service(mut self, service: impl Into<String>) -> Self {
        self.keychain_service = service.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = AtpConfig::new("https://bsky.social");
        assert_eq!(config.service_url, "https://bsky.social");
        assert_eq!(config.plc_directory_url, "https://plc.directory");
        assert_eq!(config.relay_url, "wss://bsky.network");
        assert_eq!(config.keychain_service, DEFAULT_KEYCHAIN_SERVICE);
        assert!(config.client_id.is_none());
        assert!(config.redirect_uri.is_none());
    }

    #[test]
    fn builder_overrides() {
        let config = AtpConfig::new("https://pds.test")
            .with_oauth("https://app.test/client.json", "https://app.test/cb")
            .with_plc_directory("https://plc.test")
            .with_relay("wss://relay.test")
            .with_keychain_service("my-app.tokens");
        assert_eq!(config.client_id.as_deref(), Some("https://app.test/client.json"));
        assert_eq!(config.redirect_uri.as_deref(), Some("https://app.test/cb"));
        assert_eq!(config.plc_directory_url, "https://plc.test");
        assert_eq!(config.relay_url, "wss://relay.test");
        assert_eq!(config.keychain_service, "my-app.tokens");
    }
}
