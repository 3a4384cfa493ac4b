// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// AT-URI parsing and construction.
pub mod aturi;
/// Blob reference envelope.
pub mod blob;
/// CID link envelope.
pub mod cid_link;
/// Decentralized identifiers.
pub mod did;
/// Domain-style handles.
pub mod handle;
/// Namespaced identifiers.
pub mod nsid;
/// Timestamp identifiers.
pub mod tid;

pub use aturi::{AtUri, AtUriAuthority};
pub use blob::BlobRef;
pub use cid_link::CidLink;
pub use did::{Did, DidMethod};
pub use handle::Handle;
pub use nsid::Nsid;
pub use tid::{Tid, TidClock};
