//! backhaul core: store-and-forward telemetry relay
//!
//! Lets a resource-constrained device reliably publish telemetry records to
//! a remote, intermittently-reachable data store. The heart of the crate is
//! a fixed-capacity FIFO retry queue drained at most one record per external
//! tick, with age-based backoff, oldest-first eviction on overflow and
//! per-record retry bookkeeping.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │            backhaul-core (this crate)            │
//! │  UplinkRelay = RetryQueue + RetrySchedule +      │
//! │                DiagBank, over Uplink/TickSource  │
//! └────────────────┬─────────────────────────────────┘
//!                  │
//!      ┌───────────┴────────────┐
//!      │                        │
//!      ▼                        ▼
//! ┌──────────────────┐   ┌─────────────────────┐
//! │ tokio adapter    │   │ firmware integration │
//! │ (std)            │   │ (no_std)             │
//! └──────────────────┘   └─────────────────────┘
//! ```
//!
//! The environment injects two capabilities: a monotonic logical clock
//! ([`TickSource`]) and a synchronous write capability ([`Uplink`]). The
//! relay exposes [`enqueue`](UplinkRelay::enqueue) to producers and
//! [`drain_once`](UplinkRelay::drain_once) to the periodic tick driver.
//!
//! # Scheduling model
//!
//! Single-threaded cooperative: enqueue and drain run on one logical thread
//! with no preemption during an operation, so no locks are needed. Neither
//! call blocks; the injected write capability must itself be bounded-time.
//! A drain performs at most one write attempt, keeping worst-case per-tick
//! work O(1).
//!
//! # Delivery guarantees (and non-guarantees)
//!
//! The design trades guaranteed delivery for bounded memory and bounded
//! per-tick latency: a full queue evicts its oldest record, a record that
//! exhausts its retry budget is dropped, and the queue is memory-resident —
//! lost on restart by design. All losses are visible through the
//! [`DiagBank`] counters; none is fatal to the process.
//!
//! # Example
//!
//! ```rust,ignore
//! use backhaul_core::{UplinkRelay, DrainOutcome};
//!
//! let mut relay: UplinkRelay<MyRadio, MyClock> = UplinkRelay::new(radio, clock);
//!
//! // From any event handler:
//! relay.enqueue("/device7/events/1812", "{\"soc\":71}")?;
//!
//! // Once per periodic tick (~10 s):
//! if relay.drain_once().acted() {
//!     // a record was sent, dropped or backed off
//! }
//! ```
//!
//! # Feature flags
//!
//! - `std` (default): rich error messages via `thiserror`
//! - `tracing`: structured logging on std/edge targets
//! - `defmt`: deferred-format logging on embedded targets
//! - `serde`: (de)serialization of schedules and diagnostics snapshots

#![cfg_attr(not(feature = "std"), no_std)]

pub mod backoff;
pub mod diag;
mod error;
pub mod link;
pub mod queue;
pub mod relay;

// Public API exports
pub use backoff::{RetrySchedule, MAX_RETRIES};
pub use diag::{DiagBank, DiagEvent, DiagSnapshot};
pub use error::{RelayError, RelayResult};
pub use link::{PublishError, Tick, TickSource, Uplink};
pub use queue::{QueuedRecord, RetryQueue, DEFAULT_CAPACITY, MAX_DEST_LEN, MAX_PAYLOAD_LEN};
pub use relay::{DrainOutcome, PublishPath, UplinkRelay};
