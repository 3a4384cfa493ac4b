// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::DidDocument;
use atp_error::{Error, Result};
use atp_http::{HttpExecutor, HttpRequest};
use atp_syntax::{Did, DidMethod, Handle};
use std::sync::Arc;
use tracing::debug;

/// Default PLC directory base URL.
pub const DEFAULT_PLC_DIRECTORY: &str = "https://plc.directory";

// ---------------------------------------------------------------------------
// PlcResolver
// ---------------------------------------------------------------------------

/// Resolves `did:plc` identifiers against a PLC directory.
pub struct PlcResolver {
    directory_url: String,
    executor: Arc<dyn HttpExecutor>,
}

impl PlcResolver {
    /// A resolver against the given directory base URL.
    pub fn new(directory_url: impl Into<String>, executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            directory_url: directory_url.into(),
            executor,
        }
    }

    /// Resolve a `did:plc` DID to its document.
    pub async fn resolve(&self, did: &Did) -> Result<DidDocument> {
        if did.method() != DidMethod::Plc {
            return Err(Error::DidResolution(format!(
                "PLC resolver cannot resolve method {:?}",
                did.method_name()
            )));
        }
        let url = format!("{}/{}", self.directory_url.trim_end_matches('/'), did);
        debug!(%did, %url, "resolving via PLC directory");
        fetch_document(&self.executor, &url).await
    }
}

// ---------------------------------------------------------------------------
// WebResolver
// ---------------------------------------------------------------------------

/// Resolves `did:web` identifiers via their well-known documents.
pub struct WebResolver {
    executor: Arc<dyn HttpExecutor>,
}

impl WebResolver {
    /// A resolver over the given transport.
    pub fn new(executor: Arc<dyn HttpExecutor>) -> Self {
        Self { executor }
    }

    /// Resolve a `did:web` DID to its document.
    pub async fn resolve(&self, did: &Did) -> Result<DidDocument> {
        if did.method() != DidMethod::Web {
            return Err(Error::DidResolution(format!(
                "web resolver cannot resolve method {:?}",
                did.method_name()
            )));
        }
        let mut parts = did.identifier().split(':');
        let domain = parts
            .next()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| Error::DidResolution("did:web with empty domain".into()))?;
        let path: Vec<&str> = parts.collect();

        let url = if path.is_empty() {
            format!("https://{domain}/.well-known/did.json")
        } else {
            format!("https://{domain}/{}/did.json", path.join("/"))
        };
        debug!(%did, %url, "resolving did:web document");
        fetch_document(&self.executor, &url).await
    }
}

// ---------------------------------------------------------------------------
// DidResolver
// ---------------------------------------------------------------------------

/// Composite resolver dispatching on the DID method.
pub struct DidResolver {
    plc: PlcResolver,
    web: WebResolver,
}

impl DidResolver {
    /// A composite resolver with the given PLC directory.
    pub fn new(plc_directory_url: impl Into<String>, executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            plc: PlcResolver::new(plc_directory_url, executor.clone()),
            web: WebResolver::new(executor),
        }
    }

    /// Resolve any supported DID to its document.
    pub async fn resolve(&self, did: &Did) -> Result<DidDocument> {
        match did.method() {
            DidMethod::Plc => self.plc.resolve(did).await,
            DidMethod::Web => self.web.resolve(did).await,
            DidMethod::Key | DidMethod::Other => Err(Error::DidResolution(format!(
                "unsupported method {:?}",
                did.method_name()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// HandleResolver
// ---------------------------------------------------------------------------

/// Resolves handles to DIDs via the HTTPS well-known endpoint.
pub struct HandleResolver {
    executor: Arc<dyn HttpExecutor>,
}

impl HandleResolver {
    /// A resolver over the given transport.
    pub fn new(executor: Arc<dyn HttpExecutor>) -> Self {
        Self { executor }
    }

    /// Resolve a handle to the DID it claims.
    pub async fn resolve(&self, handle: &Handle) -> Result<Did> {
        let url = format!("https://{handle}/.well-known/atproto-did");
        debug!(%handle, %url, "resolving handle");
        let request = HttpRequest::get(url).with_header("Accept", "text/plain");
        let response = self
            .executor
            .execute(request)
            .await
            .map_err(|e| Error::HandleResolution(e.to_string()))?;
        if !response.is_success() {
            return Err(Error::HandleResolution(format!(
                "well-known lookup for {handle} returned {}",
                response.status
            )));
        }
        let body = response.body_text();
        let trimmed = body.trim();
        Did::parse(trimmed).ok_or_else(|| {
            Error::HandleResolution(format!("{handle} returned invalid DID {trimmed:?}"))
        })
    }
}

async fn fetch_document(executor: &Arc<dyn HttpExecutor>, url: &str) -> Result<DidDocument> {
    let request = HttpRequest::get(url).with_header("Accept", "application/json");
    let response = executor
        .execute(request)
        .await
        .map_err(|e| Error::DidResolution(e.to_string()))?;
    if !response.is_success() {
        return Err(Error::DidResolution(format!(
            "{url} returned {}",
            response.status
        )));
    }
    serde_json::from_slice(&response.body)
        .map_err(|e| Error::DidResolution(format!("invalid DID document: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
