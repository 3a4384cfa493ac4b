// SPDX-License-Identifier: MIT OR Apache-2.0

use atp_error::{Error, Result};

/// Length of a raw `R || S` ES256 signature.
pub const RAW_SIGNATURE_LEN: usize = 64;

// ---------------------------------------------------------------------------
// DER -> raw conversion
// ---------------------------------------------------------------------------

/// Convert a DER-encoded ECDSA signature
/// (`30 <len> 02 <r_len> <R> 02 <s_len> <S>`) into the raw 64-byte
/// `R || S` form used by JOSE ES256.
///
/// A leading zero byte that padded R or S to 33 bytes is stripped; shorter
/// integers are left-zero-padded to exactly 32 bytes each.
pub fn signature_to_raw(der: &[u8]) -> Result<[u8; RAW_SIGNATURE_LEN]> {
    let mut cursor = der;

    cursor = expect_byte(cursor, 0x30, "missing DER sequence tag")?;
    let (seq_len, rest) = read_len(cursor)?;
    if seq_len != rest.len() {
        return Err(Error::InvalidSignature);
    }
    cursor = rest;

    let (r, cursor) = read_integer(cursor)?;
    let (s, cursor) = read_integer(cursor)?;
    if !cursor.is_empty() {
        return Err(Error::InvalidSignature);
    }

    let mut raw = [0u8; RAW_SIGNATURE_LEN];
    write_padded(&mut raw[..32], r)?;
    write_padded(&mut raw[32..], s)?;
    Ok(raw)
}

fn expect_byte<'a>(input: &'a [u8], expected: u8, context: &str) -> Result<&'a [u8]> {
    match input.split_first() {
        Some((&b, rest)) if b == expected => Ok(rest),
        _ => Err(Error::Crypto(format!("invalid DER signature: {context}"))),
    }
}

fn read_len(input: &[u8]) -> Result<(usize, &[u8])> {
    let (&len, rest) = input.split_first().ok_or(Error::InvalidSignature)?;
    // P-256 signatures are always short-form (< 128 bytes).
    if len >= 0x80 {
        return Err(Error::InvalidSignature);
    }
    Ok((len as usize, rest))
}

fn read_integer(input: &[u8]) -> Result<(&[u8], &[u8])> {
    let input = expect_byte(input, 0x02, "missing INTEGER tag")?;
    let (len, input) = read_len(input)?;
    if len == 0 || len > input.len() {
        return Err(Error::InvalidSignature);
    }
    let (mut value, rest) = input.split_at(len);
    // Strip the sign byte that pads a high integer to 33 bytes.
    if value.len() == 33 {
        if value[0] != 0 {
            return Err(Error::InvalidSignature);
        }
        value = &value[1..];
    }
    if value.len() > 32 {
        return Err(Error::InvalidSignature);
    }
    Ok((value, rest))
}

fn write_padded(slot: &mut [u8], value: &[u8]) -> Result<()> {
    if value.len() > slot.len() {
        return Err(Error::InvalidSignature);
    }
    let offset = slot.len() - value.len();
    slot[offset..].copy_from_slice(value);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn der_from(r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut out = vec![0x30, (4 + r.len() + s.len()) as u8];
        out.push(0x02);
        out.push(r.len() as u8);
        out.extend_from_slice(r);
        out.push(0x02);
        out.push(s.len() as u8);
        out.extend_from_slice(s);
        out
    }

    #[test]
    fn converts_full_width_integers() {
        let r = [0x11u8; 32];
        let s = [0x22u8; 32];
        let raw = signature_to_raw(&der_from(&r, &s)).unwrap();
        assert_eq!(&raw[..32], &r);
        assert_eq!(&raw[32..], &s);
    }

    #[test]
    fn strips_sign_padding_byte() {
        let mut r = vec![0x00];
        r.extend_from_slice(&[0x80; 32]);
        let s = [0x01u8; 32];
        let raw = signature_to_raw(&der_from(&r, &s)).unwrap();
        assert_eq!(&raw[..32], &[0x80; 32]);
    }

    #[test]
    fn left_pads_short_integers() {
        let raw = signature_to_raw(&der_from(&[0x7f], &[0x01, 0x02])).unwrap();
        assert_eq!(raw[31], 0x7f);
        assert_eq!(&raw[..31], &[0u8; 31]);
        assert_eq!(&raw[62..], &[0x01, 0x02]);
    }

    #[test]
    fn rejects_bad_sequence_tag() {
        let err = signature_to_raw(&[0x31, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]).unwrap_err();
        assert!(matches!(err, Error::Crypto(_)));
    }

    #[test]
    fn rejects_bad_integer_tag() {
        assert!(signature_to_raw(&[0x30, 0x06, 0x03, 0x01, 0x01, 0x02, 0x01, 0x01]).is_err());
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(signature_to_raw(&[]).is_err());
        assert!(signature_to_raw(&[0x30]).is_err());
        assert!(signature_to_raw(&[0x30, 0x10, 0x02, 0x20]).is_err());
    }

    #[test]
    fn rejects_length_mismatch() {
        // Sequence claims 10 bytes but carries 6.
        assert!(signature_to_raw(&[0x30, 0x0a, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]).is_err());
    }

    #[test]
    fn rejects_oversized_integers() {
        let r = [0x01u8; 34];
        let s = [0x01u8; 32];
        assert!(signature_to_raw(&der_from(&r, &s)).is_err());
    }
}
