//! Interrupt-to-foreground event handoff.
//!
//! Interrupt handlers never touch session state. They translate hardware
//! status bits into [`Event`]s and post them to an [`EventQueue`]; the
//! foreground poller consumes them in order.
//!
//! ```text
//!  access ISR ──┬──► EventQueue ring (SPSC) ──┐
//!  host ISR   ──┘                             ├──► Slave::poll() ──► Session / DrainEngine / Egress
//!  timer ISR  ─────► EventQueue ticks (atomic)┘
//! ```
//!
//! The host and access handlers belong to one peripheral and share its
//! interrupt priority, so together they form the ring's single producer. The
//! data-source timer may run at any priority; its [`Event::DataReady`] goes
//! to a separate atomic counter.

mod queue;

pub use queue::EventQueue;

/// One interrupt-side observation, handed to the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A host transaction finished; `command` is window byte 0 at that moment.
    TransactionComplete { command: u8 },
    /// The host wrote the second byte of the length header.
    HeaderReady,
    /// The host write cursor crossed `wrap_start`.
    WatermarkStart,
    /// The host write cursor crossed `wrap_half`.
    WatermarkHalf,
    /// The egress data source has a new frame available. Posted through
    /// [`EventQueue::tick`], never stored in the ring.
    DataReady,
    /// The peripheral flagged a bus error.
    Fault,
}
