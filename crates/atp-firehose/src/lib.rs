// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// The subscription client and its event stream.
pub mod client;
/// CBOR frame decoding into typed events.
pub mod frames;
/// Scripted transport for tests.
pub mod mock;
/// The WebSocket transport capability and its tungstenite implementation.
pub mod transport;

pub use client::{EventStream, FirehoseClient, DEFAULT_RELAY_URL, SUBSCRIBE_REPOS_NSID};
pub use frames::{
    decode_frame, AccountEvent, CommitEvent, HandleEvent, IdentityEvent, InfoEvent, RepoEvent,
    RepoOp, RepoOpAction,
};
pub use transport::{TungsteniteTransport, WebSocketConnection, WebSocketTransport, WsMessage};
