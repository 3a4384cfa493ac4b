// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_http::HttpResponse;

// ---------------------------------------------------------------------------
// RateLimit
// ---------------------------------------------------------------------------

/// Parsed `ratelimit-*` response headers.
///
/// Lookup is case-insensitive; missing or unparsable values yield `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    /// Request quota for the current window.
    pub limit: Option<i64>,
    /// Requests remaining in the current window.
    pub remaining: Option<i64>,
    /// Unix-seconds timestamp at which the window resets.
    pub reset: Option<i64>,
    /// Opaque policy descriptor.
    pub policy: Option<String>,
}

impl RateLimit {
    /// Parse the rate-limit headers from a response.
    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            limit: int_header(response, "ratelimit-limit"),
            remaining: int_header(response, "ratelimit-remaining"),
            reset: int_header(response, "ratelimit-reset"),
            policy: response.header("ratelimit-policy").map(str::to_string),
        }
    }

    /// True when any rate-limit header was present.
    pub fn is_present(&self) -> bool {
        self.limit.is_some()
            || self.remaining.is_some()
            || self.reset.is_some()
            || self.policy.is_some()
    }
}

fn int_header(response: &HttpResponse, name: &str) -> Option<i64> {
    response.header(name)?.trim().parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
