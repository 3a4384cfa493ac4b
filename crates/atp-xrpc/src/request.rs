// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_syntax::Nsid;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Percent-encoding set leaving only the unreserved characters
/// (alphanumerics plus `-._~`) bare.
pub const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Build `<service_base>/xrpc/<nsid>`, preserving any base path and
/// collapsing a trailing slash on the base.
pub fn endpoint_url(service_base: &str, nsid: &Nsid) -> String {
    let base = service_base.trim_end_matches('/');
    format!("{base}/xrpc/{nsid}")
}

/// Render query parameters in key-sorted order, percent-encoded.
///
/// Returns `None` for an empty parameter list.
pub fn query_string(params: &[(&str, &str)]) -> Option<String> {
    if params.is_empty() {
        return None;
    }
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let encoded: Vec<String> = sorted
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, COMPONENT),
                utf8_percent_encode(v, COMPONENT)
            )
        })
        .collect();
    Some(encoded.join("&"))
}

/// Endpoint URL plus an optional query string.
pub fn query_url(service_base: &str, nsid: &Nsid, params: &[(&str, &str)]) -> String {
    let endpoint = endpoint_url(service_base, nsid);
    match query_string(params) {
        Some(query) => format!("{endpoint}?{query}"),
        None => endpoint,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn nsid(s: &str) -> Nsid {
        Nsid::parse(s).unwrap()
    }

    #[test]
    fn builds_endpoint_url() {
        assert_eq!(
            endpoint_url("https://bsky.social", &nsid("app.bsky.actor.getProfile")),
            "https://bsky.social/xrpc/app.bsky.actor.getProfile"
        );
    }

    #[test]
    fn collapses_trailing_slash() {
        assert_eq!(
            endpoint_url("https://bsky.social/", &nsid("app.bsky.actor.getProfile")),
            "https://bsky.social/xrpc/app.bsky.actor.getProfile"
        );
    }

    #[test]
    fn preserves_base_path() {
        assert_eq!(
            endpoint_url("https://host.test/base/", &nsid("com.example.proc.run")),
            "https://host.test/base/xrpc/com.example.proc.run"
        );
    }

    #[test]
    fn query_params_sorted_by_key() {
        let url = query_url(
            "https://bsky.social",
            &nsid("app.bsky.feed.getFeed"),
            &[("limit", "10"), ("cursor", "abc"), ("feed", "x")],
        );
        assert_eq!(
            url,
            "https://bsky.social/xrpc/app.bsky.feed.getFeed?cursor=abc&feed=x&limit=10"
        );
    }

    #[test]
    fn values_are_percent_encoded() {
        let query = query_string(&[("q", "a b&c"), ("tag", "x~y-z._")]).unwrap();
        assert_eq!(query, "q=a%20b%26c&tag=x~y-z._");
    }

    #[test]
    fn empty_params_yield_no_query() {
        assert!(query_string(&[]).is_none());
        let url = query_url("https://bsky.social", &nsid("app.bsky.actor.getProfile"), &[]);
        assert!(!url.contains('?'));
    }
}
