//! Bucketed network-usage history.
//!
//! This module provides [`UsageHistory`], a compact time series that records
//! traffic counters into equally-sized buckets in time. Each bucket is
//! identified by its start timestamp and lasts for the instance's fixed
//! bucket duration. Bucket starts are kept sorted at all times.
//!
//! # Architecture
//!
//! Counters are stored as parallel `i64` arrays indexed in lockstep with the
//! bucket-start array. Any counter array may be permanently absent when the
//! instance does not track that field (see [`Fields`]); absent fields surface
//! as [`Entry::UNKNOWN`] in query results.
//!
//! Writes distribute a usage delta proportionally over every bucket the
//! recorded time range overlaps, creating buckets on demand. Reads
//! interpolate an [`Entry`] for an arbitrary query window, optionally
//! treating the most recent bucket as still accumulating.
//!
//! The type is a plain value: no interior locking, no background work.
//! Callers embedding it in a shared record serialize access externally.

pub mod builder;

pub use builder::HistoryBuilder;

use crate::error::{HistoryError, Result};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use tracing::debug;

/// Default number of bucket slots reserved by [`UsageHistory::new`].
pub const DEFAULT_INITIAL_CAPACITY: usize = 10;

/// Minimum slot count used when growing the backing storage.
const MIN_GROW_CAPACITY: usize = 10;

/// Bitmask describing which counter fields a history instance tracks.
///
/// Field presence is decided once at construction and never changes for the
/// lifetime of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields(u32);

impl Fields {
    /// Per-bucket active time, in milliseconds.
    pub const ACTIVE_TIME: Fields = Fields(0x01);
    /// Bytes received.
    pub const RX_BYTES: Fields = Fields(0x02);
    /// Packets received.
    pub const RX_PACKETS: Fields = Fields(0x04);
    /// Bytes transmitted.
    pub const TX_BYTES: Fields = Fields(0x08);
    /// Packets transmitted.
    pub const TX_PACKETS: Fields = Fields(0x10);
    /// Count of network operations.
    pub const OPERATIONS: Fields = Fields(0x20);
    /// All fields tracked.
    pub const ALL: Fields = Fields(0x3F);

    /// Returns true if every field in `other` is set in `self`.
    pub fn contains(self, other: Fields) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the raw bitmask value.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Creates a `Fields` mask from a raw bitmask value.
    pub fn from_u32(value: u32) -> Self {
        Fields(value & Self::ALL.0)
    }
}

impl BitOr for Fields {
    type Output = Fields;

    fn bitor(self, rhs: Fields) -> Fields {
        Fields(self.0 | rhs.0)
    }
}

impl BitOrAssign for Fields {
    fn bitor_assign(&mut self, rhs: Fields) {
        self.0 |= rhs.0;
    }
}

/// A single record in a [`UsageHistory`]: one bucket's counters, or the
/// interpolated counters of a query window.
///
/// Fields the owning history does not track carry [`Entry::UNKNOWN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Entry {
    /// Start of the period this entry covers, in milliseconds since the
    /// Unix epoch.
    pub bucket_start: i64,
    /// Milliseconds of the period during which traffic was observed.
    pub active_time: i64,
    /// Bytes received.
    pub rx_bytes: i64,
    /// Packets received.
    pub rx_packets: i64,
    /// Bytes transmitted.
    pub tx_bytes: i64,
    /// Packets transmitted.
    pub tx_packets: i64,
    /// Count of network operations performed.
    pub operations: i64,
}

impl Entry {
    /// Sentinel marking a field the owning history does not track.
    pub const UNKNOWN: i64 = -1;

    /// Creates an entry with the given counters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bucket_start: i64,
        active_time: i64,
        rx_bytes: i64,
        rx_packets: i64,
        tx_bytes: i64,
        tx_packets: i64,
        operations: i64,
    ) -> Self {
        Self {
            bucket_start,
            active_time,
            rx_bytes,
            rx_packets,
            tx_bytes,
            tx_packets,
            operations,
        }
    }

    /// Combines two entries for the same bucket into a new entry.
    ///
    /// Counters add field-wise; active time is clamped so it never exceeds
    /// the bucket duration it describes.
    ///
    /// # Panics
    ///
    /// Panics if the two entries describe different bucket starts.
    pub fn plus(self, other: Entry, bucket_duration: i64) -> Entry {
        assert_eq!(
            self.bucket_start, other.bucket_start,
            "cannot combine entries of different buckets"
        );
        Entry {
            bucket_start: self.bucket_start,
            active_time: (self.active_time + other.active_time).min(bucket_duration),
            rx_bytes: self.rx_bytes + other.rx_bytes,
            rx_packets: self.rx_packets + other.rx_packets,
            tx_bytes: self.tx_bytes + other.tx_bytes,
            tx_packets: self.tx_packets + other.tx_packets,
            operations: self.operations + other.operations,
        }
    }
}

/// A usage delta to record over a time range.
///
/// Unlike [`Entry`] a delta has no position of its own; the range passed to
/// [`UsageHistory::record_data`] decides which buckets it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageDelta {
    /// Bytes received.
    pub rx_bytes: i64,
    /// Packets received.
    pub rx_packets: i64,
    /// Bytes transmitted.
    pub tx_bytes: i64,
    /// Packets transmitted.
    pub tx_packets: i64,
    /// Count of network operations performed.
    pub operations: i64,
}

impl UsageDelta {
    /// Creates a delta carrying only byte counters.
    pub fn from_bytes(rx_bytes: i64, tx_bytes: i64) -> Self {
        Self {
            rx_bytes,
            tx_bytes,
            ..Default::default()
        }
    }

    /// Returns true if any counter is negative.
    pub fn is_negative(&self) -> bool {
        self.rx_bytes < 0
            || self.rx_packets < 0
            || self.tx_bytes < 0
            || self.tx_packets < 0
            || self.operations < 0
    }

    /// Returns true if every counter is zero.
    pub fn is_empty(&self) -> bool {
        self.rx_bytes == 0
            && self.rx_packets == 0
            && self.tx_bytes == 0
            && self.tx_packets == 0
            && self.operations == 0
    }
}

/// Multiplies `value` by the rational `num / den` without precision loss.
///
/// The product is computed in 128-bit arithmetic, where two `i64` factors
/// always fit. A quotient outside the `i64` range saturates instead of
/// wrapping. A zero denominator yields zero; callers guard their spans and
/// overlaps to be positive before calling.
pub fn multiply_safe_by_rational(value: i64, num: i64, den: i64) -> i64 {
    if den == 0 {
        return 0;
    }
    let scaled = i128::from(value) * i128::from(num) / i128::from(den);
    scaled.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Collection of historical network statistics, recorded into equally-sized
/// buckets in time.
///
/// Internally stores counters as `i64` series for efficient persistence.
/// Bucket starts are strictly increasing and unique; every present counter
/// array has the same logical length as the bucket-start array.
pub struct UsageHistory {
    /// Fixed span of every bucket, in milliseconds.
    pub(crate) bucket_duration: i64,
    /// Sorted start timestamp of each bucket.
    pub(crate) bucket_start: Vec<i64>,
    /// Milliseconds of observed traffic per bucket, when tracked.
    pub(crate) active_time: Option<Vec<i64>>,
    /// Bytes received per bucket, when tracked.
    pub(crate) rx_bytes: Option<Vec<i64>>,
    /// Packets received per bucket, when tracked.
    pub(crate) rx_packets: Option<Vec<i64>>,
    /// Bytes transmitted per bucket, when tracked.
    pub(crate) tx_bytes: Option<Vec<i64>>,
    /// Packets transmitted per bucket, when tracked.
    pub(crate) tx_packets: Option<Vec<i64>>,
    /// Operation counts per bucket, when tracked.
    pub(crate) operations: Option<Vec<i64>>,
    /// Cached sum of all rx and tx bytes.
    pub(crate) total_bytes: i64,
}

impl UsageHistory {
    /// Creates an empty history tracking all fields.
    pub fn new(bucket_duration: i64) -> Self {
        Self::with_fields(bucket_duration, DEFAULT_INITIAL_CAPACITY, Fields::ALL)
    }

    /// Creates an empty history tracking all fields, with room for
    /// `initial_capacity` buckets before the first growth.
    pub fn with_capacity(bucket_duration: i64, initial_capacity: usize) -> Self {
        Self::with_fields(bucket_duration, initial_capacity, Fields::ALL)
    }

    /// Creates an empty history tracking only the given fields.
    pub fn with_fields(bucket_duration: i64, initial_capacity: usize, fields: Fields) -> Self {
        let tracked = |field: Fields| {
            fields
                .contains(field)
                .then(|| Vec::with_capacity(initial_capacity))
        };
        Self {
            bucket_duration,
            bucket_start: Vec::with_capacity(initial_capacity),
            active_time: tracked(Fields::ACTIVE_TIME),
            rx_bytes: tracked(Fields::RX_BYTES),
            rx_packets: tracked(Fields::RX_PACKETS),
            tx_bytes: tracked(Fields::TX_BYTES),
            tx_packets: tracked(Fields::TX_PACKETS),
            operations: tracked(Fields::OPERATIONS),
            total_bytes: 0,
        }
    }

    /// Creates a history with a new bucket duration by replaying every
    /// complete bucket of `existing` into the new bucket grid.
    pub fn rebucketed(existing: &UsageHistory, bucket_duration: i64) -> Result<Self> {
        let mut history = Self::with_capacity(
            bucket_duration,
            existing.estimate_resize_buckets(bucket_duration),
        );
        history.record_entire_history(existing)?;
        Ok(history)
    }

    /// Returns the number of buckets currently stored.
    pub fn len(&self) -> usize {
        self.bucket_start.len()
    }

    /// Returns true if no buckets are stored.
    pub fn is_empty(&self) -> bool {
        self.bucket_start.is_empty()
    }

    /// Returns the fixed bucket duration, in milliseconds.
    pub fn bucket_duration(&self) -> i64 {
        self.bucket_duration
    }

    /// Returns the start of the earliest bucket, or `i64::MAX` when empty.
    pub fn start(&self) -> i64 {
        self.bucket_start.first().copied().unwrap_or(i64::MAX)
    }

    /// Returns the end of the latest bucket, or `i64::MIN` when empty.
    pub fn end(&self) -> i64 {
        self.bucket_start
            .last()
            .map(|start| start + self.bucket_duration)
            .unwrap_or(i64::MIN)
    }

    /// Returns the cached total of all rx and tx bytes.
    pub fn total_bytes(&self) -> i64 {
        self.total_bytes
    }

    /// Returns the mask of fields this instance tracks.
    pub fn fields(&self) -> Fields {
        let mut mask = Fields(0);
        let mut set = |present: bool, field: Fields| {
            if present {
                mask |= field;
            }
        };
        set(self.active_time.is_some(), Fields::ACTIVE_TIME);
        set(self.rx_bytes.is_some(), Fields::RX_BYTES);
        set(self.rx_packets.is_some(), Fields::RX_PACKETS);
        set(self.tx_bytes.is_some(), Fields::TX_BYTES);
        set(self.tx_packets.is_some(), Fields::TX_PACKETS);
        set(self.operations.is_some(), Fields::OPERATIONS);
        mask
    }

    /// Returns the index of the bucket that contains or is immediately
    /// before the requested time, clamped into the stored range.
    pub fn index_before(&self, time: i64) -> usize {
        let index = match self.bucket_start.binary_search(&time) {
            Ok(i) | Err(i) => i,
        };
        index
            .saturating_sub(1)
            .min(self.bucket_start.len().saturating_sub(1))
    }

    /// Returns the index of the bucket that contains or is immediately
    /// after the requested time, clamped into the stored range.
    pub fn index_after(&self, time: i64) -> usize {
        let index = match self.bucket_start.binary_search(&time) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        index.min(self.bucket_start.len().saturating_sub(1))
    }

    /// Returns a snapshot of the bucket at physical index `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn bucket(&self, i: usize) -> Entry {
        Entry {
            bucket_start: self.bucket_start[i],
            active_time: get_or(&self.active_time, i, Entry::UNKNOWN),
            rx_bytes: get_or(&self.rx_bytes, i, Entry::UNKNOWN),
            rx_packets: get_or(&self.rx_packets, i, Entry::UNKNOWN),
            tx_bytes: get_or(&self.tx_bytes, i, Entry::UNKNOWN),
            tx_packets: get_or(&self.tx_packets, i, Entry::UNKNOWN),
            operations: get_or(&self.operations, i, Entry::UNKNOWN),
        }
    }

    /// Returns an iterator over snapshots of all buckets in ascending
    /// start order.
    pub fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        (0..self.len()).map(|i| self.bucket(i))
    }

    /// Overwrites the bucket at physical index `i`, unwinding and reapplying
    /// its contribution to the byte total.
    ///
    /// The caller must keep bucket starts strictly increasing.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn set_values(&mut self, i: usize, entry: &Entry) {
        if let Some(values) = &self.rx_bytes {
            self.total_bytes -= values[i];
        }
        if let Some(values) = &self.tx_bytes {
            self.total_bytes -= values[i];
        }

        self.bucket_start[i] = entry.bucket_start;
        set_at(&mut self.active_time, i, entry.active_time);
        set_at(&mut self.rx_bytes, i, entry.rx_bytes);
        set_at(&mut self.rx_packets, i, entry.rx_packets);
        set_at(&mut self.tx_bytes, i, entry.tx_bytes);
        set_at(&mut self.tx_packets, i, entry.tx_packets);
        set_at(&mut self.operations, i, entry.operations);

        if let Some(values) = &self.rx_bytes {
            self.total_bytes += values[i];
        }
        if let Some(values) = &self.tx_bytes {
            self.total_bytes += values[i];
        }
    }

    /// Records that traffic occurred in the half-open range `[start, end)`,
    /// distributing the delta across internal buckets proportionally to
    /// overlap and creating buckets as needed.
    ///
    /// The distribution conserves every counter exactly: the last bucket
    /// walked absorbs whatever integer division left over, so the per-bucket
    /// allocations always sum to the input delta.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NegativeEntry`] if any counter in `delta` is
    /// negative. An all-zero delta is a silent no-op.
    pub fn record_data(&mut self, start: i64, end: i64, delta: &UsageDelta) -> Result<()> {
        if delta.is_negative() {
            return Err(HistoryError::NegativeEntry);
        }
        // An empty delta or an empty range records nothing. Skipping the
        // inverted-range case up front also keeps the byte total consistent
        // with the buckets, which never receive anything from such a call.
        if delta.is_empty() || start >= end {
            return Ok(());
        }

        let UsageDelta {
            mut rx_bytes,
            mut rx_packets,
            mut tx_bytes,
            mut tx_packets,
            mut operations,
        } = *delta;

        // create any buckets needed by this range
        self.ensure_buckets(start, end);
        // Nothing was created when the bucket duration is non-positive.
        if self.bucket_start.is_empty() {
            return Ok(());
        }

        // distribute the delta into buckets, newest first, shrinking the
        // unallocated remainder as we go
        let mut duration = end - start;
        let start_index = self.index_after(end);
        for i in (0..=start_index).rev() {
            let cur_start = self.bucket_start[i];
            let cur_end = cur_start + self.bucket_duration;

            // bucket is older than record; we're finished
            if cur_end < start {
                break;
            }
            // bucket is newer than record; keep looking
            if cur_start > end {
                continue;
            }

            let overlap = cur_end.min(end) - cur_start.max(start);
            if overlap <= 0 {
                continue;
            }

            let frac_rx_bytes = multiply_safe_by_rational(rx_bytes, overlap, duration);
            let frac_rx_packets = multiply_safe_by_rational(rx_packets, overlap, duration);
            let frac_tx_bytes = multiply_safe_by_rational(tx_bytes, overlap, duration);
            let frac_tx_packets = multiply_safe_by_rational(tx_packets, overlap, duration);
            let frac_operations = multiply_safe_by_rational(operations, overlap, duration);

            if let Some(values) = &mut self.active_time {
                // active time cannot exceed the span it describes
                values[i] = (values[i] + overlap).min(self.bucket_duration);
            }
            add_at(&mut self.rx_bytes, i, frac_rx_bytes);
            rx_bytes -= frac_rx_bytes;
            add_at(&mut self.rx_packets, i, frac_rx_packets);
            rx_packets -= frac_rx_packets;
            add_at(&mut self.tx_bytes, i, frac_tx_bytes);
            tx_bytes -= frac_tx_bytes;
            add_at(&mut self.tx_packets, i, frac_tx_packets);
            tx_packets -= frac_tx_packets;
            add_at(&mut self.operations, i, frac_operations);
            operations -= frac_operations;

            duration -= overlap;
        }

        self.total_bytes += delta.rx_bytes + delta.tx_bytes;
        Ok(())
    }

    /// Records an entire history into this one. Usually for combining
    /// together stats for external reporting.
    pub fn record_entire_history(&mut self, input: &UsageHistory) -> Result<()> {
        self.record_history(input, i64::MIN, i64::MAX)
    }

    /// Records another history into this one, copying only buckets that fall
    /// entirely inside the inclusive `[start, end]` range. Partial buckets
    /// at the edges are skipped, not interpolated.
    pub fn record_history(&mut self, input: &UsageHistory, start: i64, end: i64) -> Result<()> {
        for i in 0..input.bucket_start.len() {
            let bucket_start = input.bucket_start[i];
            let bucket_end = bucket_start + input.bucket_duration;

            // skip when bucket is outside requested range
            if bucket_start < start || bucket_end > end {
                continue;
            }

            let delta = UsageDelta {
                rx_bytes: get_or(&input.rx_bytes, i, 0),
                rx_packets: get_or(&input.rx_packets, i, 0),
                tx_bytes: get_or(&input.tx_bytes, i, 0),
                tx_packets: get_or(&input.tx_packets, i, 0),
                operations: get_or(&input.operations, i, 0),
            };
            self.record_data(bucket_start, bucket_end, &delta)?;
        }
        Ok(())
    }

    /// Returns interpolated usage across the requested half-open range,
    /// treating every bucket as complete.
    ///
    /// Fields this instance does not track carry [`Entry::UNKNOWN`] in the
    /// result.
    pub fn get_values(&self, start: i64, end: i64) -> Entry {
        self.get_values_as_of(start, end, i64::MAX)
    }

    /// Returns interpolated usage across the requested half-open range.
    ///
    /// A bucket whose nominal end lies after `now` is treated as ending at
    /// `now`, modeling a still-accumulating active bucket: its counters are
    /// scaled by the elapsed portion only. Interpolates across buckets, so
    /// values may be rounded slightly.
    pub fn get_values_as_of(&self, start: i64, end: i64, now: i64) -> Entry {
        let tracked = |array: &Option<Vec<i64>>| if array.is_some() { 0 } else { Entry::UNKNOWN };
        let mut entry = Entry {
            bucket_start: start,
            active_time: tracked(&self.active_time),
            rx_bytes: tracked(&self.rx_bytes),
            rx_packets: tracked(&self.rx_packets),
            tx_bytes: tracked(&self.tx_bytes),
            tx_packets: tracked(&self.tx_packets),
            operations: tracked(&self.operations),
        };

        if self.bucket_start.is_empty() {
            return entry;
        }

        let start_index = self.index_after(end);
        for i in (0..=start_index).rev() {
            let cur_start = self.bucket_start[i];
            let mut cur_end = cur_start + self.bucket_duration;

            // bucket is older than request; we're finished
            if cur_end <= start {
                break;
            }
            // bucket is newer than request; keep looking
            if cur_start >= end {
                continue;
            }

            // the active bucket is shorter than a normal completed bucket
            if cur_end > now {
                cur_end = now;
            }
            let bucket_span = cur_end - cur_start;
            if bucket_span <= 0 {
                continue;
            }

            let overlap = cur_end.min(end) - cur_start.max(start);
            if overlap <= 0 {
                continue;
            }

            let mut accumulate = |array: &Option<Vec<i64>>, field: &mut i64| {
                if let Some(values) = array {
                    *field += multiply_safe_by_rational(values[i], overlap, bucket_span);
                }
            };
            accumulate(&self.active_time, &mut entry.active_time);
            accumulate(&self.rx_bytes, &mut entry.rx_bytes);
            accumulate(&self.rx_packets, &mut entry.rx_packets);
            accumulate(&self.tx_bytes, &mut entry.tx_bytes);
            accumulate(&self.tx_packets, &mut entry.tx_packets);
            accumulate(&self.operations, &mut entry.operations);
        }
        entry
    }

    /// Removes every bucket that starts before the requested cutoff and
    /// recomputes the byte total over the survivors.
    ///
    /// A bucket straddling the cutoff is removed whole, including the data
    /// it holds from after the cutoff.
    pub fn remove_buckets_starting_before(&mut self, cutoff: i64) {
        let keep = self
            .bucket_start
            .iter()
            .position(|&start| start >= cutoff)
            .unwrap_or(self.bucket_start.len());
        if keep == 0 {
            return;
        }

        self.bucket_start.drain(..keep);
        for slot in self.counters_mut() {
            if let Some(values) = slot {
                values.drain(..keep);
            }
        }
        self.total_bytes = self.recompute_total_bytes();
        debug!(removed = keep, cutoff, "trimmed history buckets");
    }

    /// Drops all buckets and resets the byte total.
    ///
    /// The engine does not decide whether clearing is allowed; owners whose
    /// records hold fields that must survive (for example operation counts
    /// backing billing) gate this call themselves.
    pub fn clear(&mut self) {
        self.bucket_start.clear();
        for slot in self.counters_mut() {
            if let Some(values) = slot {
                values.clear();
            }
        }
        self.total_bytes = 0;
    }

    /// Quickly determines whether this history overlaps the given window.
    pub fn intersects(&self, start: i64, end: i64) -> bool {
        let data_start = self.start();
        let data_end = self.end();
        (start >= data_start && start <= data_end)
            || (end >= data_start && end <= data_end)
            || (data_start >= start && data_start <= end)
            || (data_end >= start && data_end <= end)
    }

    /// Estimates how many buckets this history covers at a different bucket
    /// duration.
    pub fn estimate_resize_buckets(&self, new_duration: i64) -> usize {
        if new_duration <= 0 {
            return 0;
        }
        (self.len() as i64 * self.bucket_duration / new_duration).max(0) as usize
    }

    /// Compares bucket starts, counters, and the byte total with another
    /// history.
    ///
    /// Active time is deliberately ignored: replaying a history through
    /// [`UsageHistory::record_history`] rebuilds it from overlap spans, so it
    /// is not stable across an export/import cycle.
    pub fn is_same_as(&self, other: &UsageHistory) -> bool {
        self.bucket_start == other.bucket_start
            && self.rx_bytes == other.rx_bytes
            && self.rx_packets == other.rx_packets
            && self.tx_bytes == other.tx_bytes
            && self.tx_packets == other.tx_packets
            && self.operations == other.operations
            && self.total_bytes == other.total_bytes
    }

    /// Ensures buckets exist for the given time range, creating as needed.
    fn ensure_buckets(&mut self, start: i64, end: i64) {
        if self.bucket_duration <= 0 {
            return;
        }

        // normalize incoming range to bucket boundaries
        let start = start - start.rem_euclid(self.bucket_duration);
        let end =
            end + (self.bucket_duration - end.rem_euclid(self.bucket_duration)) % self.bucket_duration;

        let mut now = start;
        while now < end {
            if let Err(index) = self.bucket_start.binary_search(&now) {
                // bucket missing, create and insert
                self.insert_bucket(index, now);
            }
            now += self.bucket_duration;
        }
    }

    /// Inserts a new zeroed bucket at the requested index and starting time.
    fn insert_bucket(&mut self, index: usize, start: i64) {
        // grow all arrays together when full, 1.5x with a floor of 10 slots
        if self.bucket_start.len() == self.bucket_start.capacity() {
            let grown = self.bucket_start.capacity().max(MIN_GROW_CAPACITY) * 3 / 2;
            let additional = grown - self.bucket_start.len();
            self.bucket_start.reserve_exact(additional);
            for slot in self.counters_mut() {
                if let Some(values) = slot {
                    values.reserve_exact(additional);
                }
            }
        }

        self.bucket_start.insert(index, start);
        for slot in self.counters_mut() {
            if let Some(values) = slot {
                values.insert(index, 0);
            }
        }
    }

    /// Recomputes the byte total from the present rx/tx arrays.
    pub(crate) fn recompute_total_bytes(&self) -> i64 {
        let mut total = 0;
        if let Some(values) = &self.rx_bytes {
            total += values.iter().sum::<i64>();
        }
        if let Some(values) = &self.tx_bytes {
            total += values.iter().sum::<i64>();
        }
        total
    }

    fn counters_mut(&mut self) -> [&mut Option<Vec<i64>>; 6] {
        [
            &mut self.active_time,
            &mut self.rx_bytes,
            &mut self.rx_packets,
            &mut self.tx_bytes,
            &mut self.tx_packets,
            &mut self.operations,
        ]
    }
}

impl fmt::Debug for UsageHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageHistory")
            .field("bucket_duration", &self.bucket_duration)
            .field("buckets", &self.len())
            .field("total_bytes", &self.total_bytes)
            .field("fields", &self.fields())
            .finish()
    }
}

impl fmt::Display for UsageHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "UsageHistory: bucket_duration={}", self.bucket_duration)?;
        for i in 0..self.len() {
            write!(f, "  st={}", self.bucket_start[i])?;
            if let Some(values) = &self.rx_bytes {
                write!(f, " rb={}", values[i])?;
            }
            if let Some(values) = &self.rx_packets {
                write!(f, " rp={}", values[i])?;
            }
            if let Some(values) = &self.tx_bytes {
                write!(f, " tb={}", values[i])?;
            }
            if let Some(values) = &self.tx_packets {
                write!(f, " tp={}", values[i])?;
            }
            if let Some(values) = &self.operations {
                write!(f, " op={}", values[i])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn get_or(array: &Option<Vec<i64>>, i: usize, default: i64) -> i64 {
    array.as_ref().map(|values| values[i]).unwrap_or(default)
}

fn set_at(array: &mut Option<Vec<i64>>, i: usize, value: i64) {
    if let Some(values) = array {
        values[i] = value;
    }
}

fn add_at(array: &mut Option<Vec<i64>>, i: usize, value: i64) {
    if let Some(values) = array {
        values[i] += value;
    }
}
