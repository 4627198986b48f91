//! Primitive reads for the Maven index binary wire format.
//!
//! Everything here is a free function taking `&mut dyn Read`, following the
//! same shape as a NAR reader's low-level helpers: this lets tests inject
//! plain byte slices, while the chunk decoder drives the very same functions
//! over a gzip stream.

use std::io::{self, ErrorKind, Read};

use crate::error::DecodeError;

/// Reads the next byte, or `Ok(None)` on clean end-of-input.
///
/// Used at record-group boundaries, where end-of-input is not an error.
pub fn try_read_u8(r: &mut dyn Read) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    match read_exact_or_eof(r, &mut buf)? {
        true => Ok(Some(buf[0])),
        false => Ok(None),
    }
}

pub fn read_u8(r: &mut dyn Read) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u16_be(r: &mut dyn Read) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

pub fn read_i32_be(r: &mut dyn Read) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

/// Reads a 4-byte big-endian field count, or `Ok(None)` if the stream ends
/// cleanly exactly at this boundary.
///
/// This is the one place end-of-input is not an error: the chunk decoder
/// reads a `field_count` at the top of every record loop, and a stream that
/// ends there terminated normally.
pub fn try_read_i32_be(r: &mut dyn Read) -> io::Result<Option<i32>> {
    let mut buf = [0u8; 4];
    match read_exact_or_eof(r, &mut buf)? {
        true => Ok(Some(i32::from_be_bytes(buf))),
        false => Ok(None),
    }
}

pub fn read_i64_be(r: &mut dyn Read) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_be_bytes(buf))
}

/// Reads a variable-length integer: seven data bits per byte, little-endian
/// accumulation, terminated by a byte whose high bit is clear.
///
/// This intentionally does *not* match the historical producer's own
/// (buggy) decoder; see the design notes for why.
pub fn read_vint(r: &mut dyn Read) -> io::Result<i64> {
    let mut value: i64 = 0;
    let mut shift = 0u32;

    loop {
        let b = read_u8(r)?;
        value |= ((b & 0x7f) as i64) << shift;

        if b & 0x80 == 0 {
            return Ok(value);
        }

        shift += 7;
        if shift >= 64 {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                "vint exceeds 64 bits",
            ));
        }
    }
}

/// Reads a short string: a 2-byte big-endian byte-length prefix followed by
/// that many modified-UTF-8 bytes. Used for field keys.
pub fn read_short_string(r: &mut dyn Read) -> Result<String, DecodeError> {
    let len = read_u16_be(r).map_err(|e| eof_or_io(e, "short string length"))? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)
        .map_err(|e| eof_or_io(e, "short string body"))?;
    decode_modified_utf8(&buf)
}

/// Reads a long string: a 4-byte big-endian byte-length prefix followed by
/// that many modified-UTF-8 bytes. Used for field values.
pub fn read_long_string(r: &mut dyn Read) -> Result<String, DecodeError> {
    let len = read_i32_be(r).map_err(|e| eof_or_io(e, "long string length"))?;
    if len < 0 {
        return Err(DecodeError::Truncated("long string length"));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)
        .map_err(|e| eof_or_io(e, "long string body"))?;
    decode_modified_utf8(&buf)
}

fn eof_or_io(e: io::Error, what: &'static str) -> DecodeError {
    if e.kind() == ErrorKind::UnexpectedEof {
        DecodeError::Truncated(what)
    } else {
        DecodeError::Io(e)
    }
}

/// Reads into `buf`, returning `Ok(true)` if it was filled completely,
/// `Ok(false)` if the very first read hit a clean end-of-input, and an error
/// for anything in between (a short read straddling the boundary).
fn read_exact_or_eof(r: &mut dyn Read, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;

    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                return if filled == 0 {
                    Ok(false)
                } else {
                    Err(ErrorKind::UnexpectedEof.into())
                };
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(true)
}

/// Decodes a modified-UTF-8 byte sequence (as produced by
/// `java.io.DataOutputStream.writeUTF`) into a [String].
///
/// Differs from standard UTF-8 in that NUL is encoded as the two-byte
/// sequence `0xC0 0x80`, and there is no four-byte form — supplementary
/// code points appear as a pair of three-byte surrogate sequences, which
/// this function recombines into a single `char`.
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    let mut pending_high_surrogate: Option<u32> = None;

    while i < bytes.len() {
        let b0 = bytes[i];

        let cp = if b0 == 0 {
            return Err(DecodeError::InvalidModifiedUtf8(b0));
        } else if b0 & 0x80 == 0 {
            // single-byte ASCII, top bit clear.
            i += 1;
            b0 as u32
        } else if b0 & 0xe0 == 0xc0 {
            let b1 = trailing_byte(bytes, i + 1)?;
            i += 2;
            (((b0 & 0x1f) as u32) << 6) | (b1 & 0x3f) as u32
        } else if b0 & 0xf0 == 0xe0 {
            let b1 = trailing_byte(bytes, i + 1)?;
            let b2 = trailing_byte(bytes, i + 2)?;
            i += 3;
            (((b0 & 0x0f) as u32) << 12) | (((b1 & 0x3f) as u32) << 6) | (b2 & 0x3f) as u32
        } else {
            return Err(DecodeError::InvalidModifiedUtf8(b0));
        };

        if let Some(high) = pending_high_surrogate.take() {
            if (0xdc00..=0xdfff).contains(&cp) {
                let combined = 0x10000 + ((high - 0xd800) << 10) + (cp - 0xdc00);
                out.push(char::from_u32(combined).ok_or(DecodeError::InvalidModifiedUtf8(b0))?);
                continue;
            } else {
                // lone high surrogate: emit the replacement-free best effort by
                // pushing it back as a pending check against the new code point.
                return Err(DecodeError::InvalidModifiedUtf8(b0));
            }
        }

        if (0xd800..=0xdbff).contains(&cp) {
            pending_high_surrogate = Some(cp);
            continue;
        }

        out.push(char::from_u32(cp).ok_or(DecodeError::InvalidModifiedUtf8(b0))?);
    }

    if pending_high_surrogate.is_some() {
        return Err(DecodeError::InvalidModifiedUtf8(0));
    }

    Ok(out)
}

fn trailing_byte(bytes: &[u8], idx: usize) -> Result<u8, DecodeError> {
    let b = *bytes
        .get(idx)
        .ok_or(DecodeError::Truncated("modified-UTF-8 trailing byte"))?;
    if b & 0xc0 != 0x80 {
        return Err(DecodeError::InvalidModifiedUtf8(b));
    }
    Ok(b)
}
