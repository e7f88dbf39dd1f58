//! Bounded lock-free single-producer single-consumer event ring, plus a
//! multi-producer tick counter for [`Event::DataReady`].
//!
//! # Safety Contract
//!
//! - Ring events ([`post()`](EventQueue::post) of anything but `DataReady`)
//!   come from ONE interrupt priority: the slave peripheral's handlers.
//! - [`tick()`](EventQueue::tick) may be called from any context at any
//!   priority. It is a single atomic increment and never touches the ring.
//! - Only ONE context may call [`next()`](EventQueue::next) and
//!   [`take_lost()`](EventQueue::take_lost) (foreground side).
//!
//! A full ring never blocks and never overwrites: the new event is discarded
//! and counted, so an interrupt refiring faster than the foreground drains is
//! visible to the foreground instead of silently merged into one flag.
//!
//! Ring events come out in post order. Pending ticks are delivered once the
//! ring is empty.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::Event;

/// Ring of `N` slots holding up to `N - 1` pending events.
pub struct EventQueue<const N: usize> {
    slots: [UnsafeCell<Event>; N],
    /// Next slot to fill (producer only).
    head: AtomicUsize,
    /// Next slot to drain (consumer only).
    tail: AtomicUsize,
    /// Events dropped because the ring was full.
    lost: AtomicUsize,
    /// `DataReady` ticks not yet delivered.
    ticks: AtomicUsize,
}

// SAFETY: `Event` is `Copy` and carries no references. A slot is written only
// by the producer while it lies outside `[tail, head)` and read only by the
// consumer while inside it; the Release/Acquire pairs on `head` and `tail`
// order those accesses.
unsafe impl<const N: usize> Sync for EventQueue<N> {}

impl<const N: usize> EventQueue<N> {
    /// Create an empty ring. `N` must be at least 2.
    pub const fn new() -> Self {
        assert!(N >= 2, "event queue needs at least 2 slots (1 usable)");

        EventQueue {
            slots: [const { UnsafeCell::new(Event::DataReady) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            lost: AtomicUsize::new(0),
            ticks: AtomicUsize::new(0),
        }
    }

    /// Post an event (producer side).
    ///
    /// `DataReady` is routed to [`tick()`](Self::tick) and always accepted.
    /// Any other event returns `false` and counts as lost if the ring is full.
    pub fn post(&self, event: Event) -> bool {
        if matches!(event, Event::DataReady) {
            self.tick();
            return true;
        }

        let head = self.head.load(Ordering::Relaxed);
        let next_head = (head + 1) % N;

        if next_head == self.tail.load(Ordering::Acquire) {
            self.lost.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // SAFETY: sole producer; `next_head != tail` means the consumer is not
        // reading this slot.
        unsafe {
            *self.slots[head].get() = event;
        }

        self.head.store(next_head, Ordering::Release);
        true
    }

    /// Record one frame tick from the data source.
    pub fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Release);
    }

    /// Take the oldest pending event (consumer side).
    pub fn next(&self) -> Option<Event> {
        let tail = self.tail.load(Ordering::Relaxed);

        if tail == self.head.load(Ordering::Acquire) {
            return self
                .ticks
                .fetch_update(Ordering::Acquire, Ordering::Relaxed, |n| n.checked_sub(1))
                .ok()
                .map(|_| Event::DataReady);
        }

        // SAFETY: sole consumer; `tail != head` means the producer has
        // published this slot and will not touch it until `tail` moves on.
        let event = unsafe { *self.slots[tail].get() };

        self.tail.store((tail + 1) % N, Ordering::Release);
        Some(event)
    }

    /// Number of events dropped since the last call, resetting the count.
    pub fn take_lost(&self) -> usize {
        self.lost.swap(0, Ordering::Relaxed)
    }

    /// Whether no events or ticks are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pending events, ticks included.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + N - tail) % N + self.ticks.load(Ordering::Acquire)
    }

    /// Maximum number of pending ring events. Ticks are not bounded by it.
    pub const fn capacity(&self) -> usize {
        N - 1
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
