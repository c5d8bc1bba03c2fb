//! Diagnostics counter bank
//!
//! Tallies delivery outcomes by category and remembers the most recent one,
//! for the periodic status line a device typically renders. Counters are
//! advisory, not correctness-critical: they wrap at `u32::MAX` rather than
//! saturate, and nothing in the relay reads them back.
//!
//! The bank is an explicit object owned by the relay (handed out through
//! [`UplinkRelay::diagnostics`](crate::relay::UplinkRelay::diagnostics))
//! rather than process-global state, so tests can inspect it in isolation.

/// Closed set of delivery outcome categories
///
/// Being a plain enum (not free-form strings) keeps the counter bank's keys
/// exhaustive and compiler-checked. Some variants are recorded by the relay
/// itself; `LinkDown` and `ClockInvalid` exist for the embedding application
/// to record through [`DiagBank::record`] when its own collaborators (radio
/// supervision, time sync) observe those conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiagEvent {
    /// Connectivity reported down by the environment
    LinkDown,
    /// Logical clock not yet valid
    ClockInvalid,
    /// Drain found the transport not ready; backoff advanced without attempt
    TransportNotReady,
    /// Direct (unqueued) write succeeded
    WriteOk,
    /// Remote store rejected the write with a 4xx-class status
    WriteRejectedClient,
    /// Remote store rejected the write with a 5xx-class status
    WriteRejectedServer,
    /// Record accepted into the retry queue
    Enqueued,
    /// Oldest record evicted to make room for a new one
    Evicted,
    /// Queued record delivered by the drain loop
    FlushOk,
    /// Record dropped after exhausting its retry budget
    Expired,
}

impl DiagEvent {
    /// Number of categories; sizes the counter array
    pub const COUNT: usize = 10;

    /// All categories in counter order
    pub const ALL: [DiagEvent; Self::COUNT] = [
        DiagEvent::LinkDown,
        DiagEvent::ClockInvalid,
        DiagEvent::TransportNotReady,
        DiagEvent::WriteOk,
        DiagEvent::WriteRejectedClient,
        DiagEvent::WriteRejectedServer,
        DiagEvent::Enqueued,
        DiagEvent::Evicted,
        DiagEvent::FlushOk,
        DiagEvent::Expired,
    ];

    /// Short static name, sized for a one-line status display
    pub const fn name(&self) -> &'static str {
        match self {
            DiagEvent::LinkDown => "LINK_DOWN",
            DiagEvent::ClockInvalid => "CLOCK_BAD",
            DiagEvent::TransportNotReady => "NOT_READY",
            DiagEvent::WriteOk => "WRITE_OK",
            DiagEvent::WriteRejectedClient => "REJ_4XX",
            DiagEvent::WriteRejectedServer => "REJ_5XX",
            DiagEvent::Enqueued => "Q_ENQ",
            DiagEvent::Evicted => "Q_EVICT",
            DiagEvent::FlushOk => "Q_OK",
            DiagEvent::Expired => "Q_EXPIRED",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Per-category tallies plus the most recent category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagBank {
    counts: [u32; DiagEvent::COUNT],
    last: Option<DiagEvent>,
}

impl DiagBank {
    /// Creates an all-zero bank
    pub const fn new() -> Self {
        Self {
            counts: [0; DiagEvent::COUNT],
            last: None,
        }
    }

    /// Increments the category's counter (wrapping) and records it as last
    pub fn record(&mut self, event: DiagEvent) {
        let idx = event.index();
        self.counts[idx] = self.counts[idx].wrapping_add(1);
        self.last = Some(event);
    }

    /// Current tally for one category
    pub fn count(&self, event: DiagEvent) -> u32 {
        self.counts[event.index()]
    }

    /// Most recently recorded category, if any
    pub fn last(&self) -> Option<DiagEvent> {
        self.last
    }

    /// Point-in-time copy of all counters for external reporting
    pub fn snapshot(&self) -> DiagSnapshot {
        DiagSnapshot {
            counts: self.counts,
            last: self.last,
        }
    }

    /// Zeroes everything; test harness use only
    pub fn reset(&mut self) {
        self.counts = [0; DiagEvent::COUNT];
        self.last = None;
    }
}

/// Frozen copy of the counter bank
///
/// Counter order matches [`DiagEvent::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagSnapshot {
    pub counts: [u32; DiagEvent::COUNT],
    pub last: Option<DiagEvent>,
}

impl DiagSnapshot {
    /// Tally for one category
    pub fn count(&self, event: DiagEvent) -> u32 {
        self.counts[event.index()]
    }
}
