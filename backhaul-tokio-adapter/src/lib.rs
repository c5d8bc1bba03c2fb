//! Tokio adapter for backhaul
//!
//! Binds the runtime-agnostic relay core to std environments running Tokio:
//!
//! - **Time**: [`TokioTickSource`] derives the core's logical ticks from
//!   `tokio::time::Instant`, so paused-time tests stay deterministic.
//! - **Drive**: [`spawn_relay`] owns a relay behind a mutex and invokes
//!   `drain_once` from a periodic interval task — the "external periodic
//!   tick" collaborator the core expects. Producers keep a cloneable
//!   [`RelayHandle`].
//!
//! The core itself stays lock-free and synchronous; serialization happens
//! only at this adapter's boundary.

pub mod driver;
pub mod time;

pub use driver::{spawn_relay, RelayHandle};
pub use time::TokioTickSource;
