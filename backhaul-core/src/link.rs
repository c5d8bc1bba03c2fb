//! Capability traits the relay requires from its environment
//!
//! The core never talks to a network or a clock directly. It consumes two
//! injected capabilities:
//!
//! - [`TickSource`] — a monotonically non-decreasing logical clock used to
//!   age queued records. Ticks are opaque; the source also supplies the
//!   tick-to-seconds conversion rate.
//! - [`Uplink`] — a synchronous, bounded-time write capability to the remote
//!   store. If the underlying transport is inherently blocking, the adapter
//!   owning it must bound or offload that before presenting `is_ready` /
//!   `publish` here; the drain loop assumes both return promptly.
//!
//! Concrete implementations live in adapter crates (see
//! `backhaul-tokio-adapter`) or in the embedding firmware.

/// Logical clock value
///
/// `u32` matches the loop counters typically available on small targets and
/// wraps in normal operation; all age arithmetic in the crate uses modular
/// subtraction so wraparound never produces a bogus age.
pub type Tick = u32;

/// Monotonic logical clock supplied by the environment
pub trait TickSource {
    /// Current tick count; must never decrease (modular wrap is fine)
    fn now(&self) -> Tick;

    /// Conversion rate from ticks to seconds
    ///
    /// May be 0 during startup before the tick driver is calibrated; the
    /// relay treats that as "age unknown" and computes an age of 0.
    fn ticks_per_second(&self) -> u32;
}

/// Synchronous write capability to the remote data store
pub trait Uplink {
    /// Whether the transport can currently attempt a write
    fn is_ready(&self) -> bool;

    /// Perform exactly one write attempt
    ///
    /// Must not block beyond a bounded time; the relay issues at most one
    /// call per drain tick and never retries within the same tick.
    fn publish(&mut self, destination: &str, payload: &str) -> Result<(), PublishError>;
}

/// Error classification for a failed write attempt
///
/// An enum instead of a string so the drain policy can classify failures
/// without parsing, and so defmt logging works in no_std builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// Connectivity was lost during the attempt
    LinkDown,
    /// The attempt timed out
    Timeout,
    /// The remote store answered and refused the write
    Rejected { status: u16 },
}

#[cfg(feature = "defmt")]
impl defmt::Format for PublishError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::LinkDown => defmt::write!(f, "LinkDown"),
            Self::Timeout => defmt::write!(f, "Timeout"),
            Self::Rejected { status } => defmt::write!(f, "Rejected({=u16})", status),
        }
    }
}

#[cfg(feature = "std")]
impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LinkDown => write!(f, "connectivity lost during write"),
            Self::Timeout => write!(f, "write attempt timed out"),
            Self::Rejected { status } => write!(f, "remote store rejected write (status {})", status),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PublishError {}
