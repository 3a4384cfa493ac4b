// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::varint;
use atp_error::{Error, Result};
use cid::Cid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Cursor;

/// The smallest byte count a CAR file can legally have.
pub const MIN_CAR_LEN: usize = 2;

#[derive(Debug, Serialize, Deserialize)]
struct CarHeader {
    roots: Vec<Cid>,
    version: u64,
}

// ---------------------------------------------------------------------------
// CarFile
// ---------------------------------------------------------------------------

/// An in-memory CAR v1 file: root CIDs plus labeled block sections.
///
/// Block sections are kept opaque (CID and payload concatenated, exactly as
/// framed on the wire); [`CarFile::parsed_blocks`] splits them. Labels are
/// synthetic (`block-N` on read) and sections are written back in label
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarFile {
    /// Root CIDs. The writer always emits the canonical empty-roots header.
    pub roots: Vec<String>,
    /// Labeled block sections.
    pub blocks: BTreeMap<String, Vec<u8>>,
}

impl CarFile {
    /// An empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse CAR bytes: varint header length, skipped header, then
    /// repeated `(varint length, section bytes)`.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_CAR_LEN {
            return Err(Error::Repository(format!(
                "CAR file too small: {} bytes",
                bytes.len()
            )));
        }

        let mut pos = 0;
        let header_len = varint::read(bytes, &mut pos)? as usize;
        pos = pos
            .checked_add(header_len)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| Error::Repository("CAR header length out of bounds".into()))?;

        let mut blocks = BTreeMap::new();
        let mut index = 0usize;
        while pos < bytes.len() {
            let section_len = varint::read(bytes, &mut pos)? as usize;
            let end = pos
                .checked_add(section_len)
                .filter(|&end| end <= bytes.len())
                .ok_or_else(|| Error::Repository("CAR block length out of bounds".into()))?;
            blocks.insert(format!("block-{index}"), bytes[pos..end].to_vec());
            pos = end;
            index += 1;
        }

        Ok(Self {
            roots: Vec::new(),
            blocks,
        })
    }

    /// Serialize: the canonical 17-byte empty-roots header prefixed by its
    /// varint length, then each section prefixed by its varint length, in
    /// ascending label order.
    pub fn write(&self) -> Result<Vec<u8>> {
        let header = serde_ipld_dagcbor::to_vec(&CarHeader {
            roots: Vec::new(),
            version: 1,
        })
        .map_err(|e| Error::Repository(format!("CAR header encoding: {e}")))?;

        let mut out = Vec::new();
        varint::write(header.len() as u64, &mut out);
        out.extend_from_slice(&header);
        for section in self.blocks.values() {
            varint::write(section.len() as u64, &mut out);
            out.extend_from_slice(section);
        }
        Ok(out)
    }

    /// Split each section into its CID and payload bytes.
    pub fn parsed_blocks(&self) -> Result<Vec<(Cid, Vec<u8>)>> {
        let mut out = Vec::with_capacity(self.blocks.len());
        for (label, section) in &self.blocks {
            let mut cursor = Cursor::new(section.as_slice());
            let cid = Cid::read_bytes(&mut cursor)
                .map_err(|e| Error::Repository(format!("{label}: invalid CID: {e}")))?;
            let data = section[cursor.position() as usize..].to_vec();
            out.push((cid, data));
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BlockStorage, MemoryBlockStorage};

    #[test]
    fn empty_file_has_canonical_header() {
        let bytes = CarFile::new().write().unwrap();
        // varint(17) then 17 bytes of DAG-CBOR {roots: [], version: 1}.
        assert_eq!(bytes.len(), 18);
        assert_eq!(bytes[0], 0x11);
        assert_eq!(
            &bytes[1..],
            &[
                0xa2, 0x65, b'r', b'o', b'o', b't', b's', 0x80, 0x67, b'v', b'e', b'r', b's',
                b'i', b'o', b'n', 0x01
            ]
        );
    }

    #[test]
    fn empty_file_round_trips() {
        let bytes = CarFile::new().write().unwrap();
        let back = CarFile::read(&bytes).unwrap();
        assert!(back.blocks.is_empty());
    }

    #[test]
    fn rejects_too_small_input() {
        for input in [&[][..], &[0x11][..]] {
            match CarFile::read(input) {
                Err(Error::Repository(reason)) => assert!(reason.contains("too small")),
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_out_of_bounds_lengths() {
        // Header claims 100 bytes but only 2 follow.
        assert!(CarFile::read(&[0x64, 0x00, 0x00]).is_err());
        // Valid empty header, then a block claiming more than remains.
        let mut bytes = CarFile::new().write().unwrap();
        bytes.push(0x10);
        bytes.push(0xAA);
        assert!(CarFile::read(&bytes).is_err());
    }

    #[test]
    fn blocks_round_trip_by_value() {
        let mut car = CarFile::new();
        car.blocks.insert("block-0".into(), vec![1, 2, 3]);
        car.blocks.insert("block-1".into(), vec![4, 5]);
        car.blocks.insert("block-2".into(), vec![]);

        let back = CarFile::read(&car.write().unwrap()).unwrap();
        let values: Vec<&Vec<u8>> = back.blocks.values().collect();
        assert_eq!(values, vec![&vec![1, 2, 3], &vec![4, 5], &vec![]]);
    }

    #[test]
    fn parsed_blocks_split_cid_and_payload() {
        let storage = MemoryBlockStorage::new();
        let data = b"record bytes".to_vec();
        let cid = storage.put(data.clone());

        let mut section = Cid::try_from(cid.as_str()).unwrap().to_bytes();
        section.extend_from_slice(&data);
        let mut car = CarFile::new();
        car.blocks.insert("block-0".into(), section);

        let parsed = car.parsed_blocks().unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].0.to_string(), cid);
        assert_eq!(parsed[0].1, data);
    }

    #[test]
    fn parsed_blocks_reject_garbage_sections() {
        let mut car = CarFile::new();
        car.blocks.insert("block-0".into(), vec![0xFF, 0xFF]);
        assert!(car.parsed_blocks().is_err());
    }
}
