//! Durable, versioned persistent encoding.
//!
//! The persistent format predates this implementation, so the layout is a
//! wire contract: big-endian fixed-width scalars, protobuf-style varints,
//! and a leading `i32` version tag. Decoding accepts every historical
//! version and normalizes it into the current in-memory representation;
//! encoding always writes the newest version.
//!
//! ## Versions
//!
//! ```text
//! v1  duration, then fixed-width arrays: bucket_start, rx_bytes, tx_bytes.
//!     Packet and operation counters did not exist yet; they decode as
//!     zero-filled. Active time decodes as untracked.
//! v2  duration, then varint arrays: bucket_start, rx_bytes, rx_packets,
//!     tx_bytes, tx_packets, operations. Active time decodes zero-filled.
//! v3  as v2, with a varint active_time array between bucket_start and
//!     rx_bytes. Current.
//! ```
//!
//! Every version recomputes the byte total from the decoded arrays; it is
//! not stored. A decode failure leaves no partial state behind: the history
//! is built into a fresh value and returned only on full success.

use crate::codec::{
    read_i32_be, read_i64_be, read_var_i64, write_i32_be, write_i64_be, write_var_i64, ABSENT_LEN,
};
use crate::error::{HistoryError, Result};
use crate::history::UsageHistory;
use std::io::{Read, Write};
use tracing::debug;

/// Initial layout: byte counters only, fixed-width values.
const VERSION_INIT: i32 = 1;
/// Added packet and operation counters, switched values to varints.
const VERSION_ADD_PACKETS: i32 = 2;
/// Added per-bucket active time. Current version.
const VERSION_ADD_ACTIVE: i32 = 3;

impl UsageHistory {
    /// Writes this history in the current persistent format.
    pub fn write_persistent<W: Write>(&self, out: &mut W) -> Result<()> {
        write_i32_be(out, VERSION_ADD_ACTIVE)?;
        write_i64_be(out, self.bucket_duration)?;
        write_var_array(out, Some(self.bucket_start.as_slice()))?;
        write_var_array(out, self.active_time.as_deref())?;
        write_var_array(out, self.rx_bytes.as_deref())?;
        write_var_array(out, self.rx_packets.as_deref())?;
        write_var_array(out, self.tx_bytes.as_deref())?;
        write_var_array(out, self.tx_packets.as_deref())?;
        write_var_array(out, self.operations.as_deref())?;
        Ok(())
    }

    /// Reads a history in any supported persistent format version.
    ///
    /// # Errors
    ///
    /// Fails with [`HistoryError::UnsupportedVersion`] on an unknown version
    /// tag and [`HistoryError::MismatchedLength`] when a decoded array
    /// disagrees with the bucket count; both mean the stream is corrupt.
    pub fn read_persistent<R: Read>(input: &mut R) -> Result<Self> {
        let version = read_i32_be(input)?;
        let mut history = match version {
            VERSION_INIT => {
                let bucket_duration = read_i64_be(input)?;
                let bucket_start = read_full_array(input)?;
                let rx_bytes = read_full_array(input)?;
                let tx_bytes = read_full_array(input)?;
                let len = bucket_start.len();
                UsageHistory {
                    bucket_duration,
                    bucket_start,
                    active_time: None,
                    rx_bytes: Some(rx_bytes),
                    rx_packets: Some(vec![0; len]),
                    tx_bytes: Some(tx_bytes),
                    tx_packets: Some(vec![0; len]),
                    operations: Some(vec![0; len]),
                    total_bytes: 0,
                }
            }
            VERSION_ADD_PACKETS | VERSION_ADD_ACTIVE => {
                let bucket_duration = read_i64_be(input)?;
                let bucket_start = read_var_array(input)?.unwrap_or_default();
                let active_time = if version >= VERSION_ADD_ACTIVE {
                    read_var_array(input)?
                } else {
                    Some(vec![0; bucket_start.len()])
                };
                UsageHistory {
                    bucket_duration,
                    bucket_start,
                    active_time,
                    rx_bytes: read_var_array(input)?,
                    rx_packets: read_var_array(input)?,
                    tx_bytes: read_var_array(input)?,
                    tx_packets: read_var_array(input)?,
                    operations: read_var_array(input)?,
                    total_bytes: 0,
                }
            }
            other => return Err(HistoryError::UnsupportedVersion(other)),
        };

        history.check_decoded_lengths()?;
        history.total_bytes = history.recompute_total_bytes();

        if version < VERSION_ADD_ACTIVE {
            debug!(version, buckets = history.len(), "decoded legacy history");
        }
        Ok(history)
    }

    /// Verifies that every present array matches the bucket count.
    fn check_decoded_lengths(&self) -> Result<()> {
        let expected = self.bucket_start.len();
        let arrays = [
            &self.active_time,
            &self.rx_bytes,
            &self.rx_packets,
            &self.tx_bytes,
            &self.tx_packets,
            &self.operations,
        ];
        for array in arrays.into_iter().flatten() {
            if array.len() != expected {
                return Err(HistoryError::MismatchedLength {
                    expected,
                    actual: array.len(),
                });
            }
        }
        Ok(())
    }
}

/// Reads a fixed-width array: i32 count then raw i64 values. The v1 layout
/// never omits arrays, so there is no absence sentinel here.
fn read_full_array<R: Read>(input: &mut R) -> Result<Vec<i64>> {
    let size = read_i32_be(input)?;
    if size < 0 {
        return Err(HistoryError::NegativeArrayLength(size));
    }
    let mut values = Vec::with_capacity(size as usize);
    for _ in 0..size {
        values.push(read_i64_be(input)?);
    }
    Ok(values)
}

fn write_var_array<W: Write>(out: &mut W, values: Option<&[i64]>) -> Result<()> {
    let Some(values) = values else {
        return write_i32_be(out, ABSENT_LEN);
    };
    write_i32_be(out, values.len() as i32)?;
    for &value in values {
        write_var_i64(out, value)?;
    }
    Ok(())
}

fn read_var_array<R: Read>(input: &mut R) -> Result<Option<Vec<i64>>> {
    let size = read_i32_be(input)?;
    if size == ABSENT_LEN {
        return Ok(None);
    }
    if size < 0 {
        return Err(HistoryError::NegativeArrayLength(size));
    }
    let mut values = Vec::with_capacity(size as usize);
    for _ in 0..size {
        values.push(read_var_i64(input)?);
    }
    Ok(Some(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Fields, UsageDelta};
    use std::io::Cursor;

    const HOUR: i64 = 3_600_000;

    fn roundtrip(history: &UsageHistory) -> UsageHistory {
        let mut buf = Vec::new();
        history.write_persistent(&mut buf).unwrap();
        UsageHistory::read_persistent(&mut Cursor::new(buf)).unwrap()
    }

    #[test]
    fn test_roundtrip_current_version() {
        let mut history = UsageHistory::new(HOUR);
        history
            .record_data(0, 4 * HOUR, &UsageDelta::from_bytes(123_456, 654_321))
            .unwrap();
        history
            .record_data(2 * HOUR, 3 * HOUR, &UsageDelta::from_bytes(777, 0))
            .unwrap();

        let decoded = roundtrip(&history);
        assert!(decoded.is_same_as(&history));
        // The current version carries active time verbatim as well.
        for i in 0..history.len() {
            assert_eq!(decoded.bucket(i).active_time, history.bucket(i).active_time);
        }
    }

    #[test]
    fn test_roundtrip_absent_fields() {
        let mut history =
            UsageHistory::with_fields(HOUR, 4, Fields::RX_BYTES | Fields::TX_BYTES);
        history
            .record_data(0, 2 * HOUR, &UsageDelta::from_bytes(999, 111))
            .unwrap();

        let decoded = roundtrip(&history);
        assert!(decoded.is_same_as(&history));
        assert_eq!(decoded.fields(), Fields::RX_BYTES | Fields::TX_BYTES);
    }

    #[test]
    fn test_total_bytes_recomputed() {
        let mut history = UsageHistory::new(HOUR);
        history
            .record_data(0, HOUR, &UsageDelta::from_bytes(600, 400))
            .unwrap();
        let decoded = roundtrip(&history);
        assert_eq!(decoded.total_bytes(), 1000);
    }

    #[test]
    fn test_decode_version_init() {
        // Hand-built v1 stream: two buckets of byte counters only.
        let mut buf = Vec::new();
        write_i32_be(&mut buf, VERSION_INIT).unwrap();
        write_i64_be(&mut buf, HOUR).unwrap();
        for array in [[0, HOUR], [100, 200], [10, 20]] {
            write_i32_be(&mut buf, 2).unwrap();
            for value in array {
                write_i64_be(&mut buf, value).unwrap();
            }
        }

        let decoded = UsageHistory::read_persistent(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.bucket_duration(), HOUR);
        assert_eq!(decoded.bucket(0).rx_bytes, 100);
        assert_eq!(decoded.bucket(1).tx_bytes, 20);
        // Counters that postdate v1 decode as zero, active time as absent.
        assert_eq!(decoded.bucket(0).rx_packets, 0);
        assert_eq!(decoded.bucket(0).operations, 0);
        assert!(!decoded.fields().contains(Fields::ACTIVE_TIME));
        assert_eq!(decoded.total_bytes(), 330);
    }

    #[test]
    fn test_decode_version_add_packets() {
        // Hand-built v2 stream: varint arrays, no active time yet.
        let mut buf = Vec::new();
        write_i32_be(&mut buf, VERSION_ADD_PACKETS).unwrap();
        write_i64_be(&mut buf, HOUR).unwrap();
        for array in [[0, HOUR], [300, 400], [3, 4], [30, 40], [1, 2], [5, 6]] {
            write_i32_be(&mut buf, 2).unwrap();
            for value in array {
                write_var_i64(&mut buf, value).unwrap();
            }
        }

        let decoded = UsageHistory::read_persistent(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.bucket(0).rx_bytes, 300);
        assert_eq!(decoded.bucket(1).rx_packets, 4);
        assert_eq!(decoded.bucket(0).tx_bytes, 30);
        assert_eq!(decoded.bucket(1).operations, 6);
        // v2 predates active time; it decodes as tracked but empty.
        assert_eq!(decoded.bucket(0).active_time, 0);
        assert_eq!(decoded.total_bytes(), 770);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut buf = Vec::new();
        write_i32_be(&mut buf, 99).unwrap();
        let err = UsageHistory::read_persistent(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, HistoryError::UnsupportedVersion(99)));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        // v3 stream whose rx_bytes array is shorter than bucket_start.
        let mut buf = Vec::new();
        write_i32_be(&mut buf, VERSION_ADD_ACTIVE).unwrap();
        write_i64_be(&mut buf, HOUR).unwrap();
        write_var_array(&mut buf, Some([0, HOUR].as_slice())).unwrap();
        write_var_array(&mut buf, Some([1, 2].as_slice())).unwrap();
        write_var_array(&mut buf, Some([7].as_slice())).unwrap();
        for _ in 0..4 {
            write_var_array(&mut buf, Some([0, 0].as_slice())).unwrap();
        }

        let err = UsageHistory::read_persistent(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(
            err,
            HistoryError::MismatchedLength {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_rejects_negative_array_length() {
        let mut buf = Vec::new();
        write_i32_be(&mut buf, VERSION_INIT).unwrap();
        write_i64_be(&mut buf, HOUR).unwrap();
        write_i32_be(&mut buf, -3).unwrap();

        let err = UsageHistory::read_persistent(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, HistoryError::NegativeArrayLength(-3)));
    }

    #[test]
    fn test_truncated_stream() {
        let mut history = UsageHistory::new(HOUR);
        history
            .record_data(0, HOUR, &UsageDelta::from_bytes(10, 10))
            .unwrap();
        let mut buf = Vec::new();
        history.write_persistent(&mut buf).unwrap();
        buf.truncate(buf.len() / 2);

        let err = UsageHistory::read_persistent(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, HistoryError::Io(_)));
    }
}
