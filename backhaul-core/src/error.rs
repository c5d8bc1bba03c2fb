//! Error handling for backhaul core operations
//!
//! A single error enum covers everything the relay can refuse to do. Both
//! variants are caller-visible rejections at enqueue time: the record never
//! entered the queue and the caller must shorten or drop the data itself.
//! Delivery failures are not errors — they are outcomes of the drain loop
//! (see [`DrainOutcome`](crate::relay::DrainOutcome)) and feed the backoff
//! machinery instead of propagating upward.
//!
//! With the `std` feature the enum derives `thiserror::Error` for rich
//! messages; no_std builds get compact `defmt` formatting instead.

#[cfg(feature = "std")]
use thiserror::Error;

/// Result alias for fallible relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors surfaced by the relay's public operations
///
/// Oversize rejections are deliberate: a truncated destination path would
/// address the wrong node and a truncated payload would corrupt structured
/// content, so neither is ever shortened on the caller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayError {
    /// Destination path exceeds the fixed slot bound
    #[cfg_attr(
        feature = "std",
        error("destination too long: {len} bytes (limit {max})")
    )]
    DestinationTooLong { len: usize, max: usize },

    /// Serialized payload exceeds the fixed slot bound
    #[cfg_attr(
        feature = "std",
        error("payload too large: {len} bytes (limit {max})")
    )]
    PayloadTooLarge { len: usize, max: usize },
}
