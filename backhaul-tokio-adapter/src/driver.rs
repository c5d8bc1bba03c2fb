//! Periodic drain driver
//!
//! The core leaves the tick cadence to an external collaborator; this module
//! is that collaborator for Tokio environments. [`spawn_relay`] parks the
//! relay behind an `Arc<Mutex<…>>`, spawns an interval task that calls
//! `drain_once` once per period, and hands back a cloneable [`RelayHandle`]
//! for producers. The drive task holds only a weak reference, so it winds
//! down once the last handle is dropped.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use backhaul_core::{
    DiagSnapshot, PublishPath, RelayResult, TickSource, Uplink, UplinkRelay, DEFAULT_CAPACITY,
};
use tokio::time::MissedTickBehavior;

/// Cloneable producer-side handle to a driven relay
///
/// All methods take the internal lock briefly; none blocks on the network —
/// the relay's own operations are synchronous and O(1).
#[derive(Debug)]
pub struct RelayHandle<L, T, const C: usize = DEFAULT_CAPACITY>
where
    L: Uplink,
    T: TickSource,
{
    inner: Arc<Mutex<UplinkRelay<L, T, C>>>,
}

impl<L, T, const C: usize> Clone for RelayHandle<L, T, C>
where
    L: Uplink,
    T: TickSource,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<L, T, const C: usize> RelayHandle<L, T, C>
where
    L: Uplink,
    T: TickSource,
{
    /// Parks a record for delivery by the drain task
    pub fn enqueue(&self, destination: &str, payload: &str) -> RelayResult<()> {
        self.inner.lock().unwrap().enqueue(destination, payload)
    }

    /// Writes immediately when the link is ready, queueing on any failure
    pub fn publish_or_enqueue(&self, destination: &str, payload: &str) -> RelayResult<PublishPath> {
        self.inner
            .lock()
            .unwrap()
            .publish_or_enqueue(destination, payload)
    }

    /// Number of records waiting for delivery
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Fixed queue capacity
    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity()
    }

    /// Point-in-time copy of the diagnostics counters
    pub fn snapshot(&self) -> DiagSnapshot {
        self.inner.lock().unwrap().snapshot()
    }

    /// Runs a closure against the relay under the lock
    ///
    /// Escape hatch for anything the convenience methods don't cover
    /// (custom diagnostics categories, link inspection). Keep the closure
    /// short; the drain task shares this lock.
    pub fn with_relay<R>(&self, f: impl FnOnce(&mut UplinkRelay<L, T, C>) -> R) -> R {
        f(&mut self.inner.lock().unwrap())
    }
}

/// Spawns the periodic drain task and returns the producer handle
///
/// One `drain_once` per `period`; a missed tick (suspended host, long stall)
/// is delayed rather than burst so the relay never fires a volley of
/// attempts at a backend that just came back.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_relay<L, T, const C: usize>(
    relay: UplinkRelay<L, T, C>,
    period: Duration,
) -> RelayHandle<L, T, C>
where
    L: Uplink + Send + 'static,
    T: TickSource + Send + 'static,
{
    let inner = Arc::new(Mutex::new(relay));
    let weak: Weak<Mutex<UplinkRelay<L, T, C>>> = Arc::downgrade(&inner);

    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;
            let Some(relay) = weak.upgrade() else {
                // Last handle gone; nothing can enqueue anymore
                break;
            };
            let outcome = relay.lock().unwrap().drain_once();

            #[cfg(feature = "tracing")]
            if outcome.acted() {
                tracing::trace!(?outcome, "drain tick");
            }
            #[cfg(not(feature = "tracing"))]
            let _ = outcome;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("relay drain task stopped");
    });

    RelayHandle { inner }
}
