//! Order-independent construction of usage histories.
//!
//! [`HistoryBuilder`] assembles a [`UsageHistory`] from bucket-aligned,
//! possibly-unordered and possibly-duplicated [`Entry`] records, for example
//! when reconstituting a history from another data source. Duplicate
//! timestamps merge additively. This path bypasses the proportional range
//! writer entirely; overlapping raw intervals belong in
//! [`UsageHistory::record_data`] instead.

use crate::history::{Entry, UsageHistory};
use std::collections::BTreeMap;

/// Builder for [`UsageHistory`] instances.
#[derive(Debug)]
pub struct HistoryBuilder {
    bucket_duration: i64,
    // Sorted and deduplicated by bucket start.
    entries: BTreeMap<i64, Entry>,
}

impl HistoryBuilder {
    /// Creates a builder producing histories with the given bucket duration.
    pub fn new(bucket_duration: i64) -> Self {
        Self {
            bucket_duration,
            entries: BTreeMap::new(),
        }
    }

    /// Adds an entry. If its timestamp is already present, the entry is
    /// combined into the existing one via [`Entry::plus`], with active time
    /// clamped to the bucket duration.
    pub fn add_entry(mut self, entry: Entry) -> Self {
        let merged = match self.entries.remove(&entry.bucket_start) {
            Some(existing) => existing.plus(entry, self.bucket_duration),
            None => entry,
        };
        self.entries.insert(merged.bucket_start, merged);
        self
    }

    /// Builds the history, flattening entries in ascending timestamp order.
    ///
    /// The result tracks every field; its byte total is the sum of all rx
    /// and tx bytes.
    pub fn build(self) -> UsageHistory {
        let size = self.entries.len();
        let mut bucket_start = Vec::with_capacity(size);
        let mut active_time = Vec::with_capacity(size);
        let mut rx_bytes = Vec::with_capacity(size);
        let mut rx_packets = Vec::with_capacity(size);
        let mut tx_bytes = Vec::with_capacity(size);
        let mut tx_packets = Vec::with_capacity(size);
        let mut operations = Vec::with_capacity(size);

        for entry in self.entries.values() {
            bucket_start.push(entry.bucket_start);
            active_time.push(entry.active_time);
            rx_bytes.push(entry.rx_bytes);
            rx_packets.push(entry.rx_packets);
            tx_bytes.push(entry.tx_bytes);
            tx_packets.push(entry.tx_packets);
            operations.push(entry.operations);
        }

        let total_bytes = rx_bytes.iter().sum::<i64>() + tx_bytes.iter().sum::<i64>();
        UsageHistory {
            bucket_duration: self.bucket_duration,
            bucket_start,
            active_time: Some(active_time),
            rx_bytes: Some(rx_bytes),
            rx_packets: Some(rx_packets),
            tx_bytes: Some(tx_bytes),
            tx_packets: Some(tx_packets),
            operations: Some(operations),
            total_bytes,
        }
    }
}
