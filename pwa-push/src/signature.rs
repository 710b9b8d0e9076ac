//! ECDSA P-256 signature transcoding between ASN.1 DER and the raw
//! `r || s` form that JWS ES256 requires.

use crate::{PushError, Result};

/// Size of one P-256 coordinate in bytes.
pub const COORDINATE_SIZE: usize = 32;

/// Size of a raw ES256 signature.
pub const RAW_SIGNATURE_SIZE: usize = 2 * COORDINATE_SIZE;

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;

/// Convert a DER `SEQUENCE { INTEGER r, INTEGER s }` into a 64-byte raw signature.
pub fn der_to_raw(der: &[u8]) -> Result<[u8; RAW_SIGNATURE_SIZE]> {
    let mut reader = DerReader::new(der);

    reader.expect_tag(TAG_SEQUENCE)?;
    let seq_len = reader.read_length()?;
    if seq_len != reader.remaining() {
        return Err(PushError::SignatureFormat(format!(
            "sequence length {} does not match remaining {} bytes",
            seq_len,
            reader.remaining()
        )));
    }

    let r = reader.read_integer()?;
    let s = reader.read_integer()?;
    if reader.remaining() != 0 {
        return Err(PushError::SignatureFormat(format!(
            "{} bytes left inside the sequence after s",
            reader.remaining()
        )));
    }

    let mut raw = [0u8; RAW_SIGNATURE_SIZE];
    raw[COORDINATE_SIZE - r.len()..COORDINATE_SIZE].copy_from_slice(r);
    raw[RAW_SIGNATURE_SIZE - s.len()..].copy_from_slice(s);
    Ok(raw)
}

/// Convert a 64-byte raw `r || s` signature into minimal DER.
pub fn raw_to_der(raw: &[u8]) -> Result<Vec<u8>> {
    if raw.len() != RAW_SIGNATURE_SIZE {
        return Err(PushError::SignatureFormat(format!(
            "raw signature must be {} bytes, got {}",
            RAW_SIGNATURE_SIZE,
            raw.len()
        )));
    }

    let r = der_integer(&raw[..COORDINATE_SIZE]);
    let s = der_integer(&raw[COORDINATE_SIZE..]);

    let mut der = Vec::with_capacity(2 + r.len() + s.len());
    der.push(TAG_SEQUENCE);
    der.push((r.len() + s.len()) as u8);
    der.extend_from_slice(&r);
    der.extend_from_slice(&s);
    Ok(der)
}

/// Encode an unsigned big-endian coordinate as a DER INTEGER.
fn der_integer(value: &[u8]) -> Vec<u8> {
    let start = value.iter().position(|b| *b != 0).unwrap_or(value.len() - 1);
    let trimmed = &value[start..];
    let sign_byte = trimmed[0] & 0x80 != 0;

    let len = trimmed.len() + usize::from(sign_byte);
    let mut out = Vec::with_capacity(2 + len);
    out.push(TAG_INTEGER);
    out.push(len as u8);
    if sign_byte {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

/// Bounds-checked cursor over a DER buffer.
struct DerReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self.buf.get(self.pos).ok_or_else(|| {
            PushError::SignatureFormat(format!("unexpected end of input at offset {}", self.pos))
        })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(PushError::SignatureFormat(format!(
                "need {} bytes at offset {}, only {} left",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn expect_tag(&mut self, tag: u8) -> Result<()> {
        let offset = self.pos;
        let found = self.read_byte()?;
        if found != tag {
            return Err(PushError::SignatureFormat(format!(
                "expected tag 0x{:02x} at offset {}, found 0x{:02x}",
                tag, offset, found
            )));
        }
        Ok(())
    }

    /// Short-form lengths, plus the single-byte long form (`0x81 nn`).
    fn read_length(&mut self) -> Result<usize> {
        match self.read_byte()? {
            len @ 0x00..=0x7f => Ok(len as usize),
            0x81 => Ok(self.read_byte()? as usize),
            other => Err(PushError::SignatureFormat(format!(
                "unsupported length encoding 0x{:02x}",
                other
            ))),
        }
    }

    /// Read an INTEGER and return its magnitude without the DER sign byte.
    fn read_integer(&mut self) -> Result<&'a [u8]> {
        self.expect_tag(TAG_INTEGER)?;
        let len = self.read_length()?;
        if len == 0 || len > COORDINATE_SIZE + 1 {
            return Err(PushError::SignatureFormat(format!(
                "integer length {} is not valid for P-256",
                len
            )));
        }

        let mut value = self.read_bytes(len)?;
        if value[0] == 0x00 {
            value = &value[1..];
        }
        if value.len() > COORDINATE_SIZE {
            return Err(PushError::SignatureFormat(format!(
                "integer magnitude of {} bytes exceeds P-256 coordinate size",
                value.len()
            )));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::{Signature, SigningKey};

    fn der_from_parts(r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut der = vec![TAG_SEQUENCE, (4 + r.len() + s.len()) as u8];
        der.extend_from_slice(&[TAG_INTEGER, r.len() as u8]);
        der.extend_from_slice(r);
        der.extend_from_slice(&[TAG_INTEGER, s.len() as u8]);
        der.extend_from_slice(s);
        der
    }

    #[test]
    fn test_strips_leading_zero() {
        let mut r = vec![0x00];
        r.extend_from_slice(&[0x80; 32]);
        let s = [0x11; 32];

        let raw = der_to_raw(&der_from_parts(&r, &s)).unwrap();
        assert_eq!(&raw[..32], &[0x80; 32]);
        assert_eq!(&raw[32..], &[0x11; 32]);
    }

    #[test]
    fn test_without_leading_zero() {
        let r = [0x7f; 32];
        let s = [0x22; 32];

        let raw = der_to_raw(&der_from_parts(&r, &s)).unwrap();
        assert_eq!(&raw[..32], &r);
        assert_eq!(&raw[32..], &s);
    }

    #[test]
    fn test_left_pads_short_integers() {
        let r = [0x01; 30];
        let s = [0x02; 31];

        let raw = der_to_raw(&der_from_parts(&r, &s)).unwrap();
        assert_eq!(&raw[..2], &[0, 0]);
        assert_eq!(&raw[2..32], &r);
        assert_eq!(raw[32], 0);
        assert_eq!(&raw[33..], &s);
    }

    #[test]
    fn test_rejects_wrong_sequence_tag() {
        let mut der = der_from_parts(&[0x01; 32], &[0x02; 32]);
        der[0] = 0x31;
        assert!(matches!(der_to_raw(&der), Err(PushError::SignatureFormat(_))));
    }

    #[test]
    fn test_rejects_wrong_integer_tag() {
        let mut der = der_from_parts(&[0x01; 32], &[0x02; 32]);
        der[2] = 0x04;
        assert!(matches!(der_to_raw(&der), Err(PushError::SignatureFormat(_))));
    }

    #[test]
    fn test_rejects_truncated_input() {
        let der = der_from_parts(&[0x01; 32], &[0x02; 32]);
        for cut in 0..der.len() {
            assert!(
                matches!(der_to_raw(&der[..cut]), Err(PushError::SignatureFormat(_))),
                "prefix of {} bytes was accepted",
                cut
            );
        }
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut der = der_from_parts(&[0x01; 32], &[0x02; 32]);
        der.extend_from_slice(&[0x00, 0x00]);
        assert!(matches!(der_to_raw(&der), Err(PushError::SignatureFormat(_))));
    }

    #[test]
    fn test_rejects_sequence_length_mismatch() {
        let mut der = der_from_parts(&[0x01; 32], &[0x02; 32]);
        der[1] = 10;
        assert!(matches!(der_to_raw(&der), Err(PushError::SignatureFormat(_))));

        // Sequence claims the whole buffer but an extra INTEGER hides at the end
        let mut der = der_from_parts(&[0x01; 32], &[0x02; 32]);
        der.extend_from_slice(&[TAG_INTEGER, 0x01, 0x05]);
        der[1] += 3;
        assert!(matches!(der_to_raw(&der), Err(PushError::SignatureFormat(_))));
    }

    #[test]
    fn test_rejects_oversized_integer() {
        // 33 bytes without a sign byte belongs to a larger curve
        let der = der_from_parts(&[0x01; 33], &[0x02; 32]);
        assert!(matches!(der_to_raw(&der), Err(PushError::SignatureFormat(_))));

        let der = der_from_parts(&[0x01; 34], &[0x02; 32]);
        assert!(matches!(der_to_raw(&der), Err(PushError::SignatureFormat(_))));
    }

    #[test]
    fn test_rejects_empty_integer() {
        let der = der_from_parts(&[], &[0x02; 32]);
        assert!(matches!(der_to_raw(&der), Err(PushError::SignatureFormat(_))));
    }

    #[test]
    fn test_raw_to_der_round_trip() {
        let mut raw = [0u8; 64];
        raw[..32].copy_from_slice(&[0x90; 32]);
        raw[33..].copy_from_slice(&[0x05; 31]);

        let der = raw_to_der(&raw).unwrap();
        // r needs a sign byte, s loses its leading zero
        assert_eq!(der[3], 33);
        assert_eq!(der_to_raw(&der).unwrap(), raw);
    }

    #[test]
    fn test_raw_to_der_rejects_wrong_length() {
        assert!(matches!(raw_to_der(&[0u8; 63]), Err(PushError::SignatureFormat(_))));
    }

    #[test]
    fn test_matches_p256_signatures() {
        let key = SigningKey::from_bytes(&[7u8; 32].into()).unwrap();
        let mut saw_sign_byte = false;
        let mut saw_plain = false;

        // RFC 6979 signing is deterministic, so this set of messages is stable
        for i in 0..64 {
            let message = format!("vapid test message {}", i);
            let signature: Signature = key.sign(message.as_bytes());
            let der = signature.to_der();
            let der = der.as_bytes();

            if der[3] == 33 {
                saw_sign_byte = true;
            } else {
                saw_plain = true;
            }

            let raw = der_to_raw(der).unwrap();
            assert_eq!(raw.as_slice(), signature.to_bytes().as_slice());
            assert_eq!(raw_to_der(&raw).unwrap(), der);
        }

        assert!(saw_sign_byte, "no fixture with a leading zero in r");
        assert!(saw_plain, "no fixture without a leading zero in r");
    }
}
