// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{DidResolver, HandleResolver};
use atp_error::{Error, Result};
use atp_http::{HttpExecutor, HttpRequest};
use atp_syntax::{Did, Handle};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

// ---------------------------------------------------------------------------
// PdsResolver
// ---------------------------------------------------------------------------

/// Discovers a subject's personal data server and its authorization server.
pub struct PdsResolver {
    did_resolver: DidResolver,
    handle_resolver: HandleResolver,
    executor: Arc<dyn HttpExecutor>,
}

#[derive(Debug, Deserialize)]
struct ProtectedResourceMetadata {
    #[serde(default)]
    authorization_servers: Vec<String>,
}

impl PdsResolver {
    /// A resolver with the given PLC directory and transport.
    pub fn new(plc_directory_url: impl Into<String>, executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            did_resolver: DidResolver::new(plc_directory_url, executor.clone()),
            handle_resolver: HandleResolver::new(executor.clone()),
            executor,
        }
    }

    /// PDS base URL for a DID.
    pub async fn for_did(&self, did: &Did) -> Result<Url> {
        let document = self.did_resolver.resolve(did).await?;
        let endpoint = document
            .pds_endpoint()
            .ok_or_else(|| Error::PdsNotFound(format!("no PDS service entry for {did}")))?;
        Url::parse(endpoint)
            .map_err(|e| Error::PdsNotFound(format!("invalid PDS endpoint {endpoint:?}: {e}")))
    }

    /// PDS base URL for a handle: resolve to a DID first, then dispatch.
    pub async fn for_handle(&self, handle: &Handle) -> Result<Url> {
        let did = self.handle_resolver.resolve(handle).await?;
        self.for_did(&did).await
    }

    /// First advertised authorization server for a PDS.
    pub async fn auth_server_for_pds(&self, pds_url: &Url) -> Result<String> {
        let url = format!(
            "{}/.well-known/oauth-protected-resource",
            pds_url.as_str().trim_end_matches('/')
        );
        debug!(%url, "discovering authorization server");
        let request = HttpRequest::get(url).with_header("Accept", "application/json");
        let response = self
            .executor
            .execute(request)
            .await
            .map_err(|e| Error::PdsNotFound(e.to_string()))?;
        if !response.is_success() {
            return Err(Error::PdsNotFound(format!(
                "protected-resource metadata returned {}",
                response.status
            )));
        }
        let metadata: ProtectedResourceMetadata = serde_json::from_slice(&response.body)
            .map_err(|e| Error::PdsNotFound(format!("invalid protected-resource metadata: {e}")))?;
        metadata
            .authorization_servers
            .into_iter()
            .next()
            .ok_or_else(|| Error::PdsNotFound("no authorization servers advertised".into()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
