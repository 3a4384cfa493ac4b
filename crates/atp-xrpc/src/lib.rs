// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Rate-limit header parsing.
pub mod ratelimit;
/// Endpoint URL and query-string construction.
pub mod request;

pub use ratelimit::RateLimit;

use async_trait::async_trait;
use atp_error::{Error, Result};
use atp_http::{HttpExecutor, HttpRequest, HttpResponse};
use atp_syntax::{BlobRef, Nsid};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// The fixed NSID used for blob uploads.
pub const UPLOAD_BLOB_NSID: &str = "com.atproto.repo.uploadBlob";

// ---------------------------------------------------------------------------
// AuthorizationProvider
// ---------------------------------------------------------------------------

/// Supplies the `Authorization` header value for outgoing requests.
///
/// Implementations may suspend (token refresh, keychain reads). The
/// returned string is placed verbatim in the header.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// The header value, e.g. `"Bearer abc"` or `"DPoP abc"`.
    async fn authorization_header(&self) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Response body of a blob upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlobUploadResponse {
    /// The stored blob's reference.
    pub blob: BlobRef,
}

#[derive(Debug, Deserialize)]
struct XrpcErrorBody {
    error: Option<String>,
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// XrpcClient
// ---------------------------------------------------------------------------

/// Typed XRPC client over an [`HttpExecutor`].
pub struct XrpcClient {
    service_url: String,
    executor: Arc<dyn HttpExecutor>,
    authorization: RwLock<Option<Arc<dyn AuthorizationProvider>>>,
    last_rate_limit: RwLock<Option<RateLimit>>,
}

impl XrpcClient {
    /// A client for the given service base URL.
    pub fn new(service_url: impl Into<String>, executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            service_url: service_url.into(),
            executor,
            authorization: RwLock::new(None),
            last_rate_limit: RwLock::new(None),
        }
    }

    /// The configured service base URL.
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Install the authorization provider consulted before each dispatch.
    pub fn set_authorization_provider(&self, provider: Arc<dyn AuthorizationProvider>) {
        *self.authorization.write().expect("authorization lock poisoned") = Some(provider);
    }

    /// Remove the authorization provider.
    pub fn clear_authorization_provider(&self) {
        *self.authorization.write().expect("authorization lock poisoned") = None;
    }

    /// Rate-limit headers from the most recent throttled response.
    pub fn last_rate_limit(&self) -> Option<RateLimit> {
        self.last_rate_limit
            .read()
            .expect("rate limit lock poisoned")
            .clone()
    }

    /// Execute a query (GET) and decode the JSON response.
    pub async fn query<T: DeserializeOwned>(
        &self,
        nsid: &Nsid,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = request::query_url(&self.service_url, nsid, params);
        let req = HttpRequest::get(url).with_default_header("Accept", "application/json");
        let response = self.dispatch(req).await?;
        decode_body(&response)
    }

    /// Execute a procedure (POST) with an optional JSON input and decode
    /// the JSON response.
    pub async fn procedure<I: Serialize, T: DeserializeOwned>(
        &self,
        nsid: &Nsid,
        input: Option<&I>,
    ) -> Result<T> {
        let response = self.procedure_raw(nsid, input).await?;
        decode_body(&response)
    }

    /// Execute a procedure (POST) whose response body is ignored; only the
    /// HTTP status is validated.
    pub async fn procedure_unit<I: Serialize>(&self, nsid: &Nsid, input: Option<&I>) -> Result<()> {
        self.procedure_raw(nsid, input).await.map(drop)
    }

    /// Upload raw bytes as a blob with the given MIME type.
    pub async fn upload_blob(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<BlobUploadResponse> {
        let nsid = Nsid::parse(UPLOAD_BLOB_NSID)
            .ok_or_else(|| Error::Internal("upload blob NSID invalid".into()))?;
        let url = request::endpoint_url(&self.service_url, &nsid);
        let req = HttpRequest::post(url)
            .with_default_header("Accept", "application/json")
            .with_header("Content-Type", mime_type)
            .with_body(bytes);
        let response = self.dispatch(req).await?;
        decode_body(&response)
    }

    async fn procedure_raw<I: Serialize>(
        &self,
        nsid: &Nsid,
        input: Option<&I>,
    ) -> Result<HttpResponse> {
        let url = request::endpoint_url(&self.service_url, nsid);
        let mut req = HttpRequest::post(url).with_default_header("Accept", "application/json");
        if let Some(input) = input {
            let body =
                serde_json::to_vec(input).map_err(|e| Error::Encoding(e.to_string()))?;
            req = req
                .with_default_header("Content-Type", "application/json")
                .with_body(body);
        }
        self.dispatch(req).await
    }

    /// Attach authorization, execute, and map non-success statuses.
    async fn dispatch(&self, mut req: HttpRequest) -> Result<HttpResponse> {
        let provider = self
            .authorization
            .read()
            .expect("authorization lock poisoned")
            .clone();
        if let Some(provider) = provider {
            let value = provider.authorization_header().await?;
            req = req.with_header("Authorization", value);
        }

        debug!(method = req.method.as_str(), url = %req.url, "xrpc dispatch");
        let response = self.executor.execute(req).await?;
        if response.is_success() {
            return Ok(response);
        }

        if response.status == 429 {
            let limits = RateLimit::from_response(&response);
            warn!(?limits, "request rate limited");
            *self
                .last_rate_limit
                .write()
                .expect("rate limit lock poisoned") = Some(limits);
        }
        Err(map_error(&response))
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn decode_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    if response.body.is_empty() {
        return Err(Error::InvalidResponse);
    }
    serde_json::from_slice(&response.body).map_err(|e| {
        Error::Decoding(format!(
            "response body as {}: {e}",
            std::any::type_name::<T>()
        ))
    })
}

/// Map a non-success response to the structured error contract.
fn map_error(response: &HttpResponse) -> Error {
    let body: Option<XrpcErrorBody> = serde_json::from_slice(&response.body).ok();
    let (error, message) = match body {
        Some(body) => (body.error, body.message),
        None => (None, None),
    };

    match response.status {
        401 => {
            if error.as_deref() == Some("ExpiredToken") {
                Error::TokenExpired
            } else {
                Error::Unauthorized
            }
        }
        429 => Error::Xrpc {
            status: 429,
            error: Some(error.unwrap_or_else(|| "RateLimitExceeded".into())),
            message: Some(message.unwrap_or_else(|| "Rate limit exceeded".into())),
        },
        status => Error::Xrpc {
            status,
            error,
            message,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
