// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// DID document model.
pub mod document;
/// PDS and authorization-server discovery.
pub mod pds;
/// DID and handle resolvers.
pub mod resolver;

pub use document::{DidDocument, ServiceEntry, VerificationMethod};
pub use pds::PdsResolver;
pub use resolver::{DidResolver, HandleResolver, PlcResolver, WebResolver, DEFAULT_PLC_DIRECTORY};
