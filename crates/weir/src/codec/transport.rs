//! Fixed-width transport encoding.
//!
//! Used for a single hand-off between cooperating processes; both ends are
//! always the current build, so the layout carries no version tag and the
//! decoder trusts the stream. Little-endian throughout.
//!
//! ## Layout
//!
//! ```text
//! bucket_duration: i64
//! seven arrays, each: count i32 (-1 = absent) then count raw i64 values
//!   bucket_start, active_time, rx_bytes, rx_packets,
//!   tx_bytes, tx_packets, operations
//! total_bytes: i64
//! ```

use crate::codec::{read_i32_le, read_i64_le, write_i32_le, write_i64_le, ABSENT_LEN};
use crate::error::{HistoryError, Result};
use crate::history::UsageHistory;
use std::io::{Read, Write};

impl UsageHistory {
    /// Writes this history in the transport format.
    pub fn write_transport<W: Write>(&self, out: &mut W) -> Result<()> {
        write_i64_le(out, self.bucket_duration)?;
        write_array(out, Some(self.bucket_start.as_slice()))?;
        write_array(out, self.active_time.as_deref())?;
        write_array(out, self.rx_bytes.as_deref())?;
        write_array(out, self.rx_packets.as_deref())?;
        write_array(out, self.tx_bytes.as_deref())?;
        write_array(out, self.tx_packets.as_deref())?;
        write_array(out, self.operations.as_deref())?;
        write_i64_le(out, self.total_bytes)?;
        Ok(())
    }

    /// Reads a history in the transport format.
    pub fn read_transport<R: Read>(input: &mut R) -> Result<Self> {
        let bucket_duration = read_i64_le(input)?;
        let bucket_start = read_array(input)?.unwrap_or_default();
        let active_time = read_array(input)?;
        let rx_bytes = read_array(input)?;
        let rx_packets = read_array(input)?;
        let tx_bytes = read_array(input)?;
        let tx_packets = read_array(input)?;
        let operations = read_array(input)?;
        let total_bytes = read_i64_le(input)?;

        Ok(Self {
            bucket_duration,
            bucket_start,
            active_time,
            rx_bytes,
            rx_packets,
            tx_bytes,
            tx_packets,
            operations,
            total_bytes,
        })
    }
}

fn write_array<W: Write>(out: &mut W, values: Option<&[i64]>) -> Result<()> {
    let Some(values) = values else {
        return write_i32_le(out, ABSENT_LEN);
    };
    write_i32_le(out, values.len() as i32)?;
    for &value in values {
        write_i64_le(out, value)?;
    }
    Ok(())
}

fn read_array<R: Read>(input: &mut R) -> Result<Option<Vec<i64>>> {
    let size = read_i32_le(input)?;
    if size == ABSENT_LEN {
        return Ok(None);
    }
    if size < 0 {
        return Err(HistoryError::NegativeArrayLength(size));
    }
    let mut values = Vec::with_capacity(size as usize);
    for _ in 0..size {
        values.push(read_i64_le(input)?);
    }
    Ok(Some(values))
}
