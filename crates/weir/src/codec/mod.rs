//! Binary encodings of [`UsageHistory`](crate::history::UsageHistory).
//!
//! Two independent formats exist and are deliberately not unified:
//!
//! - [`transport`]: fixed-width layout for a single in-memory transfer
//!   between cooperating processes. Both ends always speak the current
//!   version; there is no compatibility machinery.
//! - [`persist`]: versioned, variable-length layout for durable storage.
//!   Decoding accepts two historical layouts in addition to the current
//!   one; encoding always writes the current version.
//!
//! This module holds the primitive stream helpers both codecs share.

pub mod persist;
pub mod transport;

use crate::error::{HistoryError, Result};
use std::io::{Read, Write};

/// Length prefix marking an absent array.
pub(crate) const ABSENT_LEN: i32 = -1;

pub(crate) fn write_i32_be<W: Write>(out: &mut W, value: i32) -> Result<()> {
    out.write_all(&value.to_be_bytes())?;
    Ok(())
}

pub(crate) fn read_i32_be<R: Read>(input: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

pub(crate) fn write_i64_be<W: Write>(out: &mut W, value: i64) -> Result<()> {
    out.write_all(&value.to_be_bytes())?;
    Ok(())
}

pub(crate) fn read_i64_be<R: Read>(input: &mut R) -> Result<i64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(i64::from_be_bytes(buf))
}

pub(crate) fn write_i32_le<W: Write>(out: &mut W, value: i32) -> Result<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_i32_le<R: Read>(input: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub(crate) fn write_i64_le<W: Write>(out: &mut W, value: i64) -> Result<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_i64_le<R: Read>(input: &mut R) -> Result<i64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

/// Writes a variable-length integer: 7 data bits per byte, low group first,
/// high bit set on every byte except the last.
pub(crate) fn write_var_i64<W: Write>(out: &mut W, value: i64) -> Result<()> {
    let mut bits = value as u64;
    loop {
        if bits & !0x7F == 0 {
            out.write_all(&[bits as u8])?;
            return Ok(());
        }
        out.write_all(&[(bits as u8 & 0x7F) | 0x80])?;
        bits >>= 7;
    }
}

/// Reads a variable-length integer written by [`write_var_i64`].
///
/// # Errors
///
/// Returns [`HistoryError::MalformedVarInt`] if the continuation run would
/// exceed 64 bits of payload.
pub(crate) fn read_var_i64<R: Read>(input: &mut R) -> Result<i64> {
    let mut shift = 0u32;
    let mut result = 0u64;
    while shift < 64 {
        let mut byte = [0u8; 1];
        input.read_exact(&mut byte)?;
        result |= u64::from(byte[0] & 0x7F) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(result as i64);
        }
        shift += 7;
    }
    Err(HistoryError::MalformedVarInt)
}
