// SPDX-License-Identifier: MIT OR Apache-2.0

// ---------------------------------------------------------------------------
// OAuthSession
// ---------------------------------------------------------------------------

/// The externally visible authorization state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthSession {
    /// No tokens and no flow in progress.
    Unauthenticated,
    /// An authorization flow is awaiting its callback.
    Authorizing {
        /// The pending `state` parameter.
        state: String,
    },
    /// Valid tokens are held for the subject.
    Authenticated {
        /// The authenticated subject's DID.
        did: String,
    },
    /// Tokens are held but past their expiry.
    Expired,
    /// The flow failed terminally.
    Failed {
        /// Description of the failure.
        error: String,
    },
}

impl OAuthSession {
    /// True iff the session is [`OAuthSession::Authenticated`].
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
