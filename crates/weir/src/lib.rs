//! Weir - bucketed network-usage history engine.
//!
//! This crate provides a compact, append-friendly time series that records
//! network traffic counters into fixed-duration buckets.
//!
//! # Components
//!
//! - [`UsageHistory`]: sorted parallel-array bucket store with proportional
//!   range writes, interpolated range reads, retention trimming, and merging
//! - [`HistoryBuilder`]: order-independent assembly from bucket-aligned
//!   entries
//! - [`codec::transport`] / [`codec::persist`]: the two wire formats
//!
//! # Example
//!
//! ```rust,ignore
//! use weir::{UsageDelta, UsageHistory};
//!
//! // One-hour buckets.
//! let mut history = UsageHistory::new(3_600_000);
//!
//! // Half an hour of traffic, spread proportionally over the buckets
//! // the range overlaps.
//! history.record_data(start_ms, start_ms + 1_800_000, &UsageDelta {
//!     rx_bytes: 1000,
//!     tx_bytes: 500,
//!     ..Default::default()
//! })?;
//!
//! // Interpolated usage for an arbitrary window, bounded by "now".
//! let entry = history.get_values_as_of(window_start, window_end, now_ms);
//!
//! // Bound storage by dropping buckets older than the retention cutoff.
//! history.remove_buckets_starting_before(cutoff_ms);
//! ```

#![deny(missing_docs)]

pub mod codec;
pub mod error;
pub mod history;

pub use error::{HistoryError, Result};
pub use history::{Entry, Fields, HistoryBuilder, UsageDelta, UsageHistory};
