// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_error::{Error, Result};
use cid::Cid;
use serde::Deserialize;
use std::io::Cursor;

/// Header `op` value for message frames.
pub const OP_MESSAGE: i64 = 1;
/// Header `op` value for error frames.
pub const OP_ERROR: i64 = -1;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A typed repository event from the firehose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoEvent {
    /// A repository commit.
    Commit(CommitEvent),
    /// An identity change notice.
    Identity(IdentityEvent),
    /// A handle change notice.
    Handle(HandleEvent),
    /// An account status notice.
    Account(AccountEvent),
    /// A stream info notice.
    Info(InfoEvent),
    /// A frame type this SDK does not model; raw frame bytes retained.
    Unknown {
        /// The header `t` value.
        kind: String,
        /// The full undecoded frame.
        bytes: Vec<u8>,
    },
}

/// A repository commit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEvent {
    /// Stream sequence number.
    pub seq: i64,
    /// True when the commit's blocks were elided for size.
    pub too_big: bool,
    /// Repository DID.
    pub repo: String,
    /// Commit CID, when transmitted.
    pub commit: Option<String>,
    /// Previous commit CID, when transmitted.
    pub prev: Option<String>,
    /// Repository revision (a TID string).
    pub rev: String,
    /// Event timestamp, ISO-8601.
    pub time: String,
    /// Record operations, in commit order.
    pub ops: Vec<RepoOp>,
    /// Raw CAR block payload, when transmitted.
    pub blocks: Option<Vec<u8>>,
}

/// An identity event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityEvent {
    /// Stream sequence number.
    pub seq: i64,
    /// Subject DID.
    pub did: String,
    /// Event timestamp.
    pub time: String,
    /// New handle, when included.
    pub handle: Option<String>,
}

/// A handle change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleEvent {
    /// Stream sequence number.
    pub seq: i64,
    /// Subject DID.
    pub did: String,
    /// The new handle.
    pub handle: String,
    /// Event timestamp.
    pub time: String,
}

/// An account status event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEvent {
    /// Stream sequence number.
    pub seq: i64,
    /// Subject DID.
    pub did: String,
    /// Event timestamp.
    pub time: String,
    /// Whether the account is active.
    pub active: bool,
    /// Status detail when inactive.
    pub status: Option<String>,
}

/// A stream info event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoEvent {
    /// Info name.
    pub name: String,
    /// Optional message.
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// RepoOp
// ---------------------------------------------------------------------------

/// Action carried by a repository operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOpAction {
    /// Record created.
    Create,
    /// Record updated.
    Update,
    /// Record deleted.
    Delete,
}

impl RepoOpAction {
    // Unknown actions default to create.
    fn from_wire(action: &str) -> Self {
        match action {
            "update" => Self::Update,
            "delete" => Self::Delete,
            _ => Self::Create,
        }
    }
}

/// One record operation inside a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOp {
    /// The action performed.
    pub action: RepoOpAction,
    /// Record path, `<collection>/<rkey>`.
    pub path: String,
    /// Record CID; `None` only for deletes.
    pub cid: Option<String>,
}

impl RepoOp {
    /// The collection component of the path, when present.
    pub fn collection(&self) -> Option<&str> {
        self.path.split_once('/').map(|(collection, _)| collection)
    }

    /// The record-key component of the path, when present.
    pub fn rkey(&self) -> Option<&str> {
        self.path.split_once('/').map(|(_, rkey)| rkey)
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FrameHeader {
    op: i64,
    #[serde(default)]
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct CommitBody {
    #[serde(default)]
    seq: i64,
    #[serde(default, rename = "tooBig")]
    too_big: bool,
    #[serde(default)]
    repo: String,
    #[serde(default)]
    commit: Option<Cid>,
    #[serde(default)]
    prev: Option<Cid>,
    #[serde(default)]
    rev: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    ops: Vec<OpWire>,
    #[serde(default)]
    blocks: Option<serde_bytes::ByteBuf>,
}

#[derive(Debug, Deserialize)]
struct OpWire {
    #[serde(default)]
    action: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    cid: Option<Cid>,
}

#[derive(Debug, Deserialize)]
struct IdentityBody {
    #[serde(default)]
    seq: i64,
    #[serde(default)]
    did: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    handle: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HandleBody {
    #[serde(default)]
    seq: i64,
    #[serde(default)]
    did: String,
    #[serde(default)]
    handle: String,
    #[serde(default)]
    time: String,
}

#[derive(Debug, Deserialize)]
struct AccountBody {
    #[serde(default)]
    seq: i64,
    #[serde(default)]
    did: String,
    #[serde(default)]
    time: String,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one binary frame: the CBOR header item followed by the CBOR body
/// item.
///
/// The header is read through a cursor so the body offset falls out of the
/// consumed byte count; nothing is re-encoded.
pub fn decode_frame(bytes: &[u8]) -> Result<RepoEvent> {
    let mut cursor = Cursor::new(bytes);
    let header: FrameHeader = ciborium::de::from_reader(&mut cursor)
        .map_err(|e| Error::FrameDecoding(format!("header: {e}")))?;
    let body = &bytes[cursor.position() as usize..];
    if body.is_empty() {
        return Err(Error::FrameDecoding("no body".into()));
    }

    if header.op == OP_ERROR {
        let error: ErrorBody = serde_ipld_dagcbor::from_slice(body)
            .map_err(|e| Error::FrameDecoding(format!("error body: {e}")))?;
        let mut reason = error.error.unwrap_or_else(|| "unknown error".into());
        if let Some(message) = error.message {
            reason = format!("{reason}: {message}");
        }
        return Err(Error::connection_closed(reason));
    }

    match header.t.as_deref() {
        Some("#commit") => {
            let body: CommitBody = decode_body(body)?;
            Ok(RepoEvent::Commit(CommitEvent {
                seq: body.seq,
                too_big: body.too_big,
                repo: body.repo,
                commit: body.commit.map(|c| c.to_string()),
                prev: body.prev.map(|c| c.to_string()),
                rev: body.rev,
                time: body.time,
                ops: body
                    .ops
                    .into_iter()
                    .map(|op| RepoOp {
                        action: RepoOpAction::from_wire(&op.action),
                        path: op.path,
                        cid: op.cid.map(|c| c.to_string()),
                    })
                    .collect(),
                blocks: body.blocks.map(serde_bytes::ByteBuf::into_vec),
            }))
        }
        Some("#identity") => {
            let body: IdentityBody = decode_body(body)?;
            Ok(RepoEvent::Identity(IdentityEvent {
                seq: body.seq,
                did: body.did,
                time: body.time,
                handle: body.handle,
            }))
        }
        Some("#handle") => {
            let body: HandleBody = decode_body(body)?;
            Ok(RepoEvent::Handle(HandleEvent {
                seq: body.seq,
                did: body.did,
                handle: body.handle,
                time: body.time,
            }))
        }
        Some("#account") => {
            let body: AccountBody = decode_body(body)?;
            Ok(RepoEvent::Account(AccountEvent {
                seq: body.seq,
                did: body.did,
                time: body.time,
                active: body.active,
                status: body.status,
            }))
        }
        Some("#info") => {
            let body: InfoBody = decode_body(body)?;
            Ok(RepoEvent::Info(InfoEvent {
                name: body.name,
                message: body.message,
            }))
        }
        other => Ok(RepoEvent::Unknown {
            kind: other.unwrap_or_default().to_string(),
            bytes: bytes.to_vec(),
        }),
    }
}

fn decode_body<'de, T: Deserialize<'de>>(body: &'de [u8]) -> Result<T> {
    serde_ipld_dagcbor::from_slice(body).map_err(|e| Error::FrameDecoding(format!("body: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    fn frame<H: Serialize, B: Serialize>(header: &H, body: &B) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(header, &mut out).unwrap();
        ciborium::ser::into_writer(body, &mut out).unwrap();
        out
    }

    fn message_header(t: &str) -> serde_json::Value {
        serde_json::json!({"op": 1, "t": t})
    }

    #[test]
    fn decodes_commit_with_ops() {
        let bytes = frame(
            &message_header("#commit"),
            &serde_json::json!({
                "seq": 42,
                "repo": "did:plc:x",
                "rev": "3jzfcijpj2z2a",
                "time": "2024-01-01T00:00:00.000Z",
                "ops": [{"action": "create", "path": "app.bsky.feed.post/abc"}]
            }),
        );
        let event = decode_frame(&bytes).unwrap();
        let commit = match event {
            RepoEvent::Commit(commit) => commit,
            other => panic!("unexpected event: {other:?}"),
        };
        assert_eq!(commit.seq, 42);
        assert_eq!(commit.repo, "did:plc:x");
        assert_eq!(commit.rev, "3jzfcijpj2z2a");
        assert!(!commit.too_big);
        assert_eq!(commit.ops.len(), 1);
        assert_eq!(commit.ops[0].action, RepoOpAction::Create);
        assert_eq!(commit.ops[0].collection(), Some("app.bsky.feed.post"));
        assert_eq!(commit.ops[0].rkey(), Some("abc"));
    }

    #[test]
    fn missing_fields_take_documented_defaults() {
        let bytes = frame(&message_header("#commit"), &serde_json::json!({}));
        match decode_frame(&bytes).unwrap() {
            RepoEvent::Commit(commit) => {
                assert_eq!(commit.seq, 0);
                assert!(!commit.too_big);
                assert_eq!(commit.repo, "");
                assert_eq!(commit.rev, "");
                assert!(commit.ops.is_empty());
                assert!(commit.blocks.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_op_action_defaults_to_create() {
        let bytes = frame(
            &message_header("#commit"),
            &serde_json::json!({"ops": [{"action": "upsert", "path": "a.b.c/k"}]}),
        );
        match decode_frame(&bytes).unwrap() {
            RepoEvent::Commit(commit) => {
                assert_eq!(commit.ops[0].action, RepoOpAction::Create)
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn pathless_op_has_no_collection_or_rkey() {
        let op = RepoOp {
            action: RepoOpAction::Delete,
            path: "justonesegment".into(),
            cid: None,
        };
        assert!(op.collection().is_none());
        assert!(op.rkey().is_none());
    }

    #[test]
    fn decodes_identity_event() {
        let bytes = frame(
            &message_header("#identity"),
            &serde_json::json!({"seq": 7, "did": "did:plc:y", "time": "t", "handle": "alice.test"}),
        );
        match decode_frame(&bytes).unwrap() {
            RepoEvent::Identity(event) => {
                assert_eq!(event.seq, 7);
                assert_eq!(event.did, "did:plc:y");
                assert_eq!(event.handle.as_deref(), Some("alice.test"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_handle_event() {
        let bytes = frame(
            &message_header("#handle"),
            &serde_json::json!({"seq": 8, "did": "did:plc:y", "handle": "bob.test", "time": "t"}),
        );
        match decode_frame(&bytes).unwrap() {
            RepoEvent::Handle(event) => assert_eq!(event.handle, "bob.test"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_account_event_with_default_active() {
        let bytes = frame(
            &message_header("#account"),
            &serde_json::json!({"seq": 9, "did": "did:plc:y", "time": "t"}),
        );
        match decode_frame(&bytes).unwrap() {
            RepoEvent::Account(event) => {
                assert!(event.active);
                assert!(event.status.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_info_event() {
        let bytes = frame(
            &message_header("#info"),
            &serde_json::json!({"name": "OutdatedCursor", "message": "cursor too old"}),
        );
        match decode_frame(&bytes).unwrap() {
            RepoEvent::Info(event) => {
                assert_eq!(event.name, "OutdatedCursor");
                assert_eq!(event.message.as_deref(), Some("cursor too old"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_keeps_raw_frame_bytes() {
        let bytes = frame(&message_header("#sync"), &serde_json::json!({"seq": 1}));
        match decode_frame(&bytes).unwrap() {
            RepoEvent::Unknown { kind, bytes: raw } => {
                assert_eq!(kind, "#sync");
                assert_eq!(raw, bytes);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn error_frame_becomes_connection_closed() {
        let bytes = frame(
            &serde_json::json!({"op": -1}),
            &serde_json::json!({"error": "ConsumerTooSlow", "message": "catch up"}),
        );
        match decode_frame(&bytes).unwrap_err() {
            Error::ConnectionClosed { reason } => {
                assert_eq!(reason.as_deref(), Some("ConsumerTooSlow: catch up"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn frame_without_body_is_rejected() {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&message_header("#commit"), &mut bytes).unwrap();
        match decode_frame(&bytes).unwrap_err() {
            Error::FrameDecoding(reason) => assert_eq!(reason, "no body"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn garbage_header_is_a_frame_error() {
        assert!(matches!(
            decode_frame(&[0xff, 0x00]),
            Err(Error::FrameDecoding(_))
        ));
    }
}
