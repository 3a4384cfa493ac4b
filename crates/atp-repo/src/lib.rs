// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// CAR v1 reading and writing.
pub mod car;
/// Merkle Search Tree model and traversal.
pub mod mst;
/// Content-addressed block storage.
pub mod storage;
/// Unsigned LEB128 varints.
pub mod varint;

pub use car::CarFile;
pub use mst::{MstEntry, MstNode, MstReader};
pub use storage::{BlockStorage, MemoryBlockStorage};
