//! Time and tick scheduling seams for the player.
//!
//! The player never reads a clock or arms a timer on its own. The host asks
//! a [`TickScheduler`] for ticks and feeds each due tick back to the player
//! together with a timestamp from a [`Clock`]. In the egui host a scheduled
//! tick means "repaint next frame"; in tests ticks fire only when the test
//! says so.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic time source in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Milliseconds since construction, from `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Identifies one scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(pub u64);

/// "Call me back on the next frame" capability.
pub trait TickScheduler {
    /// Request one tick. The returned handle identifies it until it fires
    /// or is cancelled.
    fn schedule(&mut self) -> TickHandle;

    /// Forget a requested tick. Cancelling an unknown handle is a no-op.
    fn cancel(&mut self, handle: TickHandle);

    /// Next tick that should fire now, if any. Removes it from the pending set.
    fn take_due(&mut self) -> Option<TickHandle>;

    /// Number of requested ticks that neither fired nor were cancelled.
    fn pending(&self) -> usize;
}

/// Scheduler with no side effects: every requested tick is due on the next
/// `take_due` call.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending: Vec<TickHandle>,
    scheduled_total: u64,
    cancelled_total: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks requested over the scheduler's lifetime.
    pub fn scheduled_total(&self) -> u64 {
        self.scheduled_total
    }

    /// Ticks cancelled over the scheduler's lifetime.
    pub fn cancelled_total(&self) -> u64 {
        self.cancelled_total
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&mut self) -> TickHandle {
        self.next_id += 1;
        self.scheduled_total += 1;
        let handle = TickHandle(self.next_id);
        self.pending.push(handle);
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        let before = self.pending.len();
        self.pending.retain(|h| *h != handle);
        if self.pending.len() != before {
            self.cancelled_total += 1;
        }
    }

    fn take_due(&mut self) -> Option<TickHandle> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }
}
