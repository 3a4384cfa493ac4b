// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::discovery::{AuthServerDiscovery, AuthorizationServerMetadata};
use crate::dpop::DpopManager;
use crate::form;
use crate::pkce;
use crate::session::OAuthSession;
use crate::tokens::{SecureStorage, TokenManager, TokenSet};
use atp_crypto::CryptoProvider;
use atp_error::{Error, Result};
use atp_http::{HttpExecutor, HttpRequest, HttpResponse};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use url::Url;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Construction-time OAuth client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    /// OAuth client identifier (a URL for this protocol family).
    pub client_id: String,
    /// Redirect URI registered for the client.
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
struct PendingAuth {
    verifier: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct ParResponse {
    request_uri: String,
    #[serde(default)]
    #[allow(dead_code)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error_uri: Option<String>,
}

// ---------------------------------------------------------------------------
// OAuthClient
// ---------------------------------------------------------------------------

/// Drives the full authorization flow: PAR, callback exchange, refresh,
/// and session projection.
pub struct OAuthClient {
    config: OAuthConfig,
    executor: Arc<dyn HttpExecutor>,
    dpop: DpopManager,
    discovery: AuthServerDiscovery,
    tokens: TokenManager,
    pending: RwLock<Option<PendingAuth>>,
    metadata: RwLock<Option<AuthorizationServerMetadata>>,
}

impl OAuthClient {
    /// A client bound to a fresh DPoP key pair.
    pub fn new(
        config: OAuthConfig,
        executor: Arc<dyn HttpExecutor>,
        crypto: Arc<dyn CryptoProvider>,
        storage: Option<Arc<dyn SecureStorage>>,
        storage_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            executor: executor.clone(),
            dpop: DpopManager::new(crypto)?,
            discovery: AuthServerDiscovery::new(executor),
            tokens: TokenManager::new(storage, storage_key),
            pending: RwLock::new(None),
            metadata: RwLock::new(None),
        })
    }

    /// The DPoP manager bound to this client's key pair.
    pub fn dpop(&self) -> &DpopManager {
        &self.dpop
    }

    /// The token manager owning the current token set.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Begin an authorization flow and return the URL to present.
    ///
    /// Discovers server metadata, pushes the authorization request (with
    /// one DPoP nonce retry), and returns
    /// `<authorization_endpoint>?client_id=...&request_uri=...`.
    pub async fn authorize(&self, auth_server_url: &str, scope: &str) -> Result<String> {
        let metadata = self.discovery.discover(auth_server_url).await?;
        let par_endpoint = metadata.par_endpoint.clone().ok_or_else(|| Error::OAuth {
            error: "invalid_request".into(),
            description: Some(
                "authorization server does not advertise a PAR endpoint".into(),
            ),
            uri: None,
        })?;

        let challenge_pair = pkce::generate(self.crypto_provider());
        let state = pkce::generate_state(self.crypto_provider());
        *self.pending.write().expect("pending lock poisoned") = Some(PendingAuth {
            verifier: challenge_pair.verifier.clone(),
            state: state.clone(),
        });
        *self.metadata.write().expect("metadata lock poisoned") = Some(metadata.clone());

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scope),
            ("state", state.as_str()),
            ("code_challenge", challenge_pair.challenge.as_str()),
            ("code_challenge_method", pkce::CHALLENGE_METHOD),
        ];
        debug!(%par_endpoint, "pushing authorization request");
        let response = self.post_with_dpop(&par_endpoint, &form).await?;
        let par: ParResponse = serde_json::from_slice(&response.body)
            .map_err(|e| Error::Decoding(format!("PAR response: {e}")))?;

        Ok(format!(
            "{}?{}",
            metadata.authorization_endpoint,
            form::encode(&[
                ("client_id", self.config.client_id.as_str()),
                ("request_uri", par.request_uri.as_str()),
            ])
        ))
    }

    /// Complete the flow from the redirect callback URL.
    ///
    /// Verifies `state`, exchanges the code at the token endpoint (with the
    /// same DPoP nonce retry as PAR), stores tokens, and clears the pending
    /// PKCE state.
    pub async fn handle_callback(&self, callback_url: &str) -> Result<OAuthSession> {
        let url = Url::parse(callback_url)
            .map_err(|e| Error::InvalidUrl(format!("{callback_url}: {e}")))?;
        let params: HashMap<String, String> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if let Some(error) = params.get("error") {
            return Err(Error::OAuth {
                error: error.clone(),
                description: params.get("error_description").cloned(),
                uri: params.get("error_uri").cloned(),
            });
        }

        let code = params.get("code").ok_or_else(|| Error::OAuth {
            error: "invalid_request".into(),
            description: Some("callback missing code".into()),
            uri: None,
        })?;
        let state = params.get("state").ok_or_else(|| Error::OAuth {
            error: "invalid_state".into(),
            description: Some("callback missing state".into()),
            uri: None,
        })?;

        let pending = self
            .pending
            .read()
            .expect("pending lock poisoned")
            .clone()
            .ok_or_else(|| Error::OAuth {
                error: "invalid_state".into(),
                description: Some("no authorization flow in progress".into()),
                uri: None,
            })?;
        if pending.state != *state {
            warn!("callback state mismatch");
            return Err(Error::OAuth {
                error: "invalid_state".into(),
                description: Some("state parameter does not match".into()),
                uri: None,
            });
        }

        let token_endpoint = self.token_endpoint()?;
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", pending.verifier.as_str()),
        ];
        let response = self.post_with_dpop(&token_endpoint, &form).await?;
        let tokens: TokenSet = serde_json::from_slice(&response.body)
            .map_err(|e| Error::Decoding(format!("token response: {e}")))?;
        let did = tokens.sub.clone();
        self.tokens.store_tokens(tokens).await?;

        // One write clears verifier and state together.
        *self.pending.write().expect("pending lock poisoned") = None;
        debug!(%did, "authorization complete");
        Ok(OAuthSession::Authenticated { did })
    }

    /// Exchange the stored refresh token for a fresh token set.
    pub async fn refresh_tokens(&self) -> Result<TokenSet> {
        let current = self.tokens.get_tokens().await?;
        let refresh_token = current
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .ok_or_else(|| Error::TokenRefreshFailed("no refresh token stored".into()))?;

        let token_endpoint = self
            .token_endpoint()
            .map_err(|_| Error::TokenRefreshFailed("authorization server unknown".into()))?;
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];
        debug!("refreshing tokens");
        let response = self.post_with_dpop(&token_endpoint, &form).await?;
        let tokens: TokenSet = serde_json::from_slice(&response.body)
            .map_err(|e| Error::Decoding(format!("token response: {e}")))?;
        // Storing is the last step so a cancelled refresh never leaves
        // half-written tokens.
        self.tokens.store_tokens(tokens.clone()).await?;
        Ok(tokens)
    }

    /// The current access token, refreshing first when inside the refresh
    /// window.
    pub async fn get_access_token(&self) -> Result<String> {
        if self.tokens.needs_refresh().await? {
            self.refresh_tokens().await?;
        }
        self.tokens
            .get_tokens()
            .await?
            .map(|t| t.access_token)
            .ok_or(Error::SessionRequired)
    }

    /// Project the current session state.
    pub async fn get_session(&self) -> Result<OAuthSession> {
        if let Some(pending) = self.pending.read().expect("pending lock poisoned").clone() {
            return Ok(OAuthSession::Authorizing {
                state: pending.state,
            });
        }
        match self.tokens.get_tokens().await? {
            None => Ok(OAuthSession::Unauthenticated),
            Some(tokens) => {
                if self.tokens.is_expired().await? {
                    Ok(OAuthSession::Expired)
                } else {
                    Ok(OAuthSession::Authenticated { did: tokens.sub })
                }
            }
        }
    }

    fn crypto_provider(&self) -> &dyn CryptoProvider {
        self.dpop.crypto_provider()
    }

    fn token_endpoint(&self) -> Result<String> {
        self.metadata
            .read()
            .expect("metadata lock poisoned")
            .as_ref()
            .map(|m| m.token_endpoint.clone())
            .ok_or(Error::SessionRequired)
    }

    /// POST a form with a DPoP proof; on a 400 carrying `DPoP-Nonce`,
    /// store the nonce and retry exactly once.
    async fn post_with_dpop(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        let response = self.post_form(url, form).await?;
        if response.status == 400 {
            if let Some(nonce) = response.header("dpop-nonce") {
                debug!("retrying with server-provided DPoP nonce");
                self.dpop.update_nonce(nonce);
                let retried = self.post_form(url, form).await?;
                return check_oauth_response(retried);
            }
        }
        check_oauth_response(response)
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        let proof = self.dpop.generate_proof("POST", url, None)?;
        let request = HttpRequest::post(url)
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_header("DPoP", proof)
            .with_body(form::encode(form).into_bytes());
        self.executor.execute(request).await
    }
}

fn check_oauth_response(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    match serde_json::from_slice::<OAuthErrorBody>(&response.body) {
        Ok(body) => Err(Error::OAuth {
            error: body.error,
            description: body.error_description,
            uri: body.error_uri,
        }),
        Err(_) => Err(Error::Xrpc {
            status: response.status,
            error: None,
            message: None,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
