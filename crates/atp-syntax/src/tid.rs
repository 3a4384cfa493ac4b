// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_error::Error;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// The sortable base32 alphabet used by TIDs.
pub const TID_ALPHABET: &[u8; 32] = b"234567abcdefghijklmnopqrstuvwxyz";

/// TID string length in characters.
pub const TID_LEN: usize = 13;

const CLOCK_ID_MASK: u64 = 0x3FF;

// ---------------------------------------------------------------------------
// Tid
// ---------------------------------------------------------------------------

/// A timestamp identifier: a 64-bit value packed as
/// `(timestamp_us << 10) | (clock_id & 0x3FF)`, rendered as 13 characters
/// of the sortable base32 alphabet.
///
/// Natural numeric order equals lexicographic string order, so TIDs sort
/// correctly both ways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(u64);

impl Tid {
    /// Construct from a timestamp in microseconds and a clock id.
    ///
    /// The clock id is masked to its low 10 bits.
    pub fn from_parts(timestamp_us: u64, clock_id: u64) -> Self {
        Self((timestamp_us << 10) | (clock_id & CLOCK_ID_MASK))
    }

    /// Construct from the raw packed 64-bit representation.
    pub fn from_packed(packed: u64) -> Self {
        Self(packed)
    }

    /// A TID for the current instant (microseconds since the Unix epoch).
    pub fn now(clock_id: u64) -> Self {
        let us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Self::from_parts(us, clock_id)
    }

    /// Parse a 13-character TID string, returning `None` when invalid.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != TID_LEN {
            return None;
        }
        let mut packed: u64 = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let idx = TID_ALPHABET.iter().position(|&a| a == b)? as u64;
            // The first character carries only 4 of its 5 bits.
            if i == 0 && idx >= 16 {
                return None;
            }
            packed = (packed << 5) | idx;
        }
        Some(Self(packed))
    }

    /// Microseconds since the Unix epoch.
    pub fn timestamp_us(&self) -> u64 {
        self.0 >> 10
    }

    /// The 10-bit clock id.
    pub fn clock_id(&self) -> u64 {
        self.0 & CLOCK_ID_MASK
    }

    /// The raw packed 64-bit representation.
    pub fn packed(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [0u8; TID_LEN];
        for (i, slot) in out.iter_mut().enumerate() {
            let shift = 60 - 5 * i;
            *slot = TID_ALPHABET[((self.0 >> shift) & 0x1F) as usize];
        }
        // Alphabet bytes are ASCII.
        f.write_str(std::str::from_utf8(&out).expect("alphabet is ASCII"))
    }
}

impl FromStr for Tid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidTid(s.to_string()))
    }
}

impl Serialize for Tid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Tid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// TidClock
// ---------------------------------------------------------------------------

/// Issues strictly increasing TIDs even when the microsecond clock stalls
/// or steps backwards.
#[derive(Debug, Default)]
pub struct TidClock {
    last: Mutex<u64>,
}

impl TidClock {
    /// A fresh clock with no issued TIDs.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next TID for the given clock id.
    pub fn next(&self, clock_id: u64) -> Tid {
        let candidate = Tid::now(clock_id).packed();
        let mut last = self.last.lock().expect("tid clock lock poisoned");
        let issued = if candidate > *last { candidate } else { *last + 1 };
        *last = issued;
        Tid::from_packed(issued)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn packs_and_unpacks() {
        let tid = Tid::from_parts(1_700_000_000_000_000, 42);
        assert_eq!(tid.timestamp_us(), 1_700_000_000_000_000);
        assert_eq!(tid.clock_id(), 42);
    }

    #[test]
    fn clock_id_is_masked() {
        let tid = Tid::from_parts(1, 0xFFFF);
        assert_eq!(tid.clock_id(), 0x3FF);
        assert_eq!(tid.timestamp_us(), 1);
    }

    #[test]
    fn string_is_13_chars_of_alphabet() {
        let s = Tid::from_parts(1_700_000_000_000_000, 7).to_string();
        assert_eq!(s.len(), TID_LEN);
        assert!(s.bytes().all(|b| TID_ALPHABET.contains(&b)));
    }

    #[test]
    fn string_round_trips() {
        let tid = Tid::from_parts(1_234_567_890_123_456, 999);
        let back = Tid::parse(&tid.to_string()).unwrap();
        assert_eq!(back, tid);
        assert_eq!(back.packed(), tid.packed());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Tid::parse("").is_none());
        assert!(Tid::parse("3jzfcijpj2z2").is_none());
        assert!(Tid::parse("3jzfcijpj2z2aa").is_none());
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        assert!(Tid::parse("3jzfcijpj2z2A").is_none());
        assert!(Tid::parse("3jzfcijpj2z21").is_none());
        assert!(Tid::parse("3jzfcijpj2z2!").is_none());
    }

    #[test]
    fn rejects_high_first_character() {
        // Index 16 and above in the alphabet implies a set 65th bit.
        let bad = format!("{}222222222222", TID_ALPHABET[16] as char);
        assert!(Tid::parse(&bad).is_none());
        let good = format!("{}222222222222", TID_ALPHABET[15] as char);
        assert!(Tid::parse(&good).is_some());
    }

    #[test]
    fn now_is_close_to_system_time() {
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_micros() as u64;
        let tid = Tid::now(0);
        let after = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_micros() as u64;
        assert!(tid.timestamp_us() >= before);
        assert!(tid.timestamp_us() <= after);
    }

    #[test]
    fn clock_issues_strictly_increasing() {
        let clock = TidClock::new();
        let mut prev = clock.next(5);
        for _ in 0..100 {
            let next = clock.next(5);
            assert!(next > prev, "{next} not after {prev}");
            prev = next;
        }
    }

    proptest! {
        #[test]
        fn order_matches_string_order(a in 0u64..(1 << 63), b in 0u64..(1 << 63)) {
            let (ta, tb) = (Tid::from_packed(a), Tid::from_packed(b));
            prop_assert_eq!(a < b, ta.to_string() < tb.to_string());
        }

        #[test]
        fn encode_decode_bijective(ts in 0u64..(1 << 53), clock in 0u64..1024) {
            let tid = Tid::from_parts(ts, clock);
            let back = Tid::parse(&tid.to_string()).unwrap();
            prop_assert_eq!(back.timestamp_us(), ts);
            prop_assert_eq!(back.clock_id(), clock);
        }
    }
}
