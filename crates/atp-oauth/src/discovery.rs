// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_error::{Error, Result};
use atp_http::{HttpExecutor, HttpRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Well-known path for authorization-server metadata.
pub const METADATA_PATH: &str = "/.well-known/oauth-authorization-server";

// ---------------------------------------------------------------------------
// AuthorizationServerMetadata
// ---------------------------------------------------------------------------

/// Authorization-server metadata, reduced to the fields this SDK consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    /// The issuer URL; must equal the URL metadata was requested for.
    pub issuer: String,
    /// Authorization endpoint.
    pub authorization_endpoint: String,
    /// Token endpoint.
    pub token_endpoint: String,
    /// PAR endpoint; the authorize flow fails without one.
    #[serde(
        default,
        rename = "pushed_authorization_request_endpoint",
        skip_serializing_if = "Option::is_none"
    )]
    pub par_endpoint: Option<String>,
    /// Supported scopes, when advertised.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes_supported: Vec<String>,
    /// DPoP signing algorithms, when advertised.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dpop_signing_alg_values_supported: Vec<String>,
}

// ---------------------------------------------------------------------------
// AuthServerDiscovery
// ---------------------------------------------------------------------------

/// Fetches and memoizes authorization-server metadata by issuer URL.
pub struct AuthServerDiscovery {
    executor: Arc<dyn HttpExecutor>,
    cache: RwLock<HashMap<String, AuthorizationServerMetadata>>,
}

impl AuthServerDiscovery {
    /// A discovery instance over the given transport.
    pub fn new(executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            executor,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Metadata for `issuer`, fetched once and memoized by the issuer URL
    /// string.
    ///
    /// Fails with an `invalid_issuer` OAuth error when the advertised
    /// issuer differs from the requested one.
    pub async fn discover(&self, issuer: &str) -> Result<AuthorizationServerMetadata> {
        if let Some(cached) = self.cache.read().await.get(issuer) {
            return Ok(cached.clone());
        }

        let url = format!("{}{METADATA_PATH}", issuer.trim_end_matches('/'));
        debug!(%issuer, %url, "discovering authorization server metadata");
        let request = HttpRequest::get(url).with_header("Accept", "application/json");
        let response = self.executor.execute(request).await?;
        if !response.is_success() {
            return Err(Error::OAuth {
                error: "invalid_authorization_server".into(),
                description: Some(format!(
                    "metadata endpoint returned {}",
                    response.status
                )),
                uri: None,
            });
        }
        let metadata: AuthorizationServerMetadata = serde_json::from_slice(&response.body)
            .map_err(|e| Error::Decoding(format!("authorization server metadata: {e}")))?;

        if metadata.issuer != issuer {
            return Err(Error::OAuth {
                error: "invalid_issuer".into(),
                description: Some(format!(
                    "requested {issuer}, server advertised {}",
                    metadata.issuer
                )),
                uri: None,
            });
        }

        self.cache
            .write()
            .await
            .insert(issuer.to_string(), metadata.clone());
        Ok(metadata)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use atp_http::mock::MockExecutor;

    fn metadata_json(issuer: &str) -> String {
        format!(
            r#"{{
                "issuer": "{issuer}",
                "authorization_endpoint": "{issuer}/oauth/authorize",
                "token_endpoint": "{issuer}/oauth/token",
                "pushed_authorization_request_endpoint": "{issuer}/oauth/par"
            }}"#
        )
    }

    #[tokio::test]
    async fn fetches_and_parses_metadata() {
        let mock = Arc::new(MockExecutor::new());
        mock.enqueue_json(200, &metadata_json("https://auth.test"));
        let discovery = AuthServerDiscovery::new(mock.clone());
        let metadata = discovery.discover("https://auth.test").await.unwrap();
        assert_eq!(metadata.token_endpoint, "https://auth.test/oauth/token");
        assert_eq!(
            metadata.par_endpoint.as_deref(),
            Some("https://auth.test/oauth/par")
        );
        assert_eq!(
            mock.requests()[0].url,
            "https://auth.test/.well-known/oauth-authorization-server"
        );
    }

    #[tokio::test]
    async fn memoizes_by_issuer() {
        let mock = Arc::new(MockExecutor::new());
        mock.enqueue_json(200, &metadata_json("https://auth.test"));
        let discovery = AuthServerDiscovery::new(mock.clone());
        discovery.discover("https://auth.test").await.unwrap();
        discovery.discover("https://auth.test").await.unwrap();
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn issuer_mismatch_is_rejected() {
        let mock = Arc::new(MockExecutor::new());
        mock.enqueue_json(200, &metadata_json("https://evil.test"));
        let discovery = AuthServerDiscovery::new(mock);
        let err = discovery.discover("https://auth.test").await.unwrap_err();
        match err {
            Error::OAuth { error, .. } => assert_eq!(error, "invalid_issuer"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_success_status_is_an_oauth_error() {
        let mock = Arc::new(MockExecutor::new());
        mock.enqueue_json(404, "{}");
        let discovery = AuthServerDiscovery::new(mock);
        let err = discovery.discover("https://auth.test").await.unwrap_err();
        assert!(matches!(err, Error::OAuth { .. }));
    }
}
