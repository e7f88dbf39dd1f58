//! Bus peripheral collaborator and interrupt entry points.
//!
//! [`SlaveBus`] is everything the protocol needs from the slave peripheral
//! driver: window access, interrupt control, the outbound queue and the host
//! notification line. Boards implement it over their vendor HAL; tests use
//! [`memory::MemoryBus`].
//!
//! ## Interrupt sources
//!
//! | Source | Bits | Entry point |
//! |--------|------|-------------|
//! | Host / command | [`Interrupts::HOST`] | [`service_host_interrupt`] |
//! | Window access | [`Interrupts::ACCESS`] | [`service_access_interrupt`] |
//!
//! Both entry points only read and clear status, post [`Event`]s and service
//! the outbound queue. They never block or log.

pub mod memory;
pub mod mmio;

use core::ops::{BitAnd, BitOr, BitOrAssign};

use crate::config::{Interface, SlaveConfig};
use crate::event::{Event, EventQueue};

/// Set of peripheral interrupt bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interrupts(u16);

impl Interrupts {
    pub const NONE: Self = Interrupts(0);

    // ── Host / command interrupt ───────────────────────────────────────────

    /// A host write transaction completed.
    pub const TRANSFER_COMPLETE: Self = Interrupts(1 << 0);
    /// Outbound queue fill level crossed the configured threshold.
    pub const QUEUE_THRESHOLD: Self = Interrupts(1 << 1);
    /// Bus protocol error.
    pub const ERROR: Self = Interrupts(1 << 2);

    // ── Window access interrupt ────────────────────────────────────────────

    /// Second length-header byte (offset 1) written.
    pub const HEADER: Self = Interrupts(1 << 8);
    /// Host cursor crossed `wrap_start`.
    pub const WATERMARK_START: Self = Interrupts(1 << 9);
    /// Host cursor crossed `wrap_half`.
    pub const WATERMARK_HALF: Self = Interrupts(1 << 10);

    // ── Groups ─────────────────────────────────────────────────────────────

    pub const HOST: Self = Interrupts(Self::TRANSFER_COMPLETE.0 | Self::QUEUE_THRESHOLD.0 | Self::ERROR.0);
    pub const WATERMARKS: Self = Interrupts(Self::WATERMARK_START.0 | Self::WATERMARK_HALF.0);
    pub const ACCESS: Self = Interrupts(Self::HEADER.0 | Self::WATERMARKS.0);
    pub const ALL: Self = Interrupts(Self::HOST.0 | Self::ACCESS.0);

    /// Mask from raw status bits.
    pub const fn from_bits(bits: u16) -> Self {
        Interrupts(bits & Self::ALL.0)
    }

    /// Raw status bits.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// This mask with the bits of `other` cleared.
    pub const fn without(self, other: Self) -> Self {
        Interrupts(self.0 & !other.0)
    }
}

impl BitOr for Interrupts {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Interrupts(self.0 | rhs.0)
    }
}

impl BitOrAssign for Interrupts {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Interrupts {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Interrupts(self.0 & rhs.0)
    }
}

/// Slave peripheral driver, as seen by the streaming protocol.
///
/// Offsets are window byte offsets. Implementations must make window reads
/// and writes volatile with respect to the host.
pub trait SlaveBus {
    /// Error type for peripheral operations.
    type Error;

    /// Power up peripheral `module` in the given interface mode.
    fn initialize(&mut self, module: u8, interface: Interface) -> Result<(), Self::Error>;

    /// Apply window geometry and outbound queue settings.
    fn configure(&mut self, config: &SlaveConfig) -> Result<(), Self::Error>;

    /// Power the peripheral down.
    fn deinitialize(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Currently latched interrupt status.
    fn interrupt_status(&mut self) -> Result<Interrupts, Self::Error>;

    fn interrupt_clear(&mut self, mask: Interrupts) -> Result<(), Self::Error>;

    fn interrupt_enable(&mut self, mask: Interrupts) -> Result<(), Self::Error>;

    fn interrupt_disable(&mut self, mask: Interrupts) -> Result<(), Self::Error>;

    /// Copy `dst.len()` window bytes starting at `offset`.
    fn read_window(&mut self, offset: usize, dst: &mut [u8]) -> Result<(), Self::Error>;

    /// Store `src` into the window starting at `offset`.
    fn write_window(&mut self, offset: usize, src: &[u8]) -> Result<(), Self::Error>;

    /// Enqueue bytes for the host. Returns how many were accepted.
    fn queue_write(&mut self, bytes: &[u8]) -> Result<usize, Self::Error>;

    /// Bytes currently waiting in the outbound queue.
    fn queue_space_used(&mut self) -> Result<usize, Self::Error>;

    /// Drop everything waiting in the outbound queue.
    fn queue_clear(&mut self) -> Result<(), Self::Error>;

    /// Move queued bytes into the hardware FIFO after a threshold interrupt.
    fn queue_service(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Publish the queue fill counter the host reads before draining.
    fn queue_commit(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Raise `signal` on the host notification line.
    fn notify_host(&mut self, signal: u8) -> Result<(), Self::Error>;

    /// Prepare the notification line for a read session.
    fn arm_handshake(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Host / command interrupt handler body.
///
/// Snapshots window byte 0 on transaction completion so the foreground sees
/// the command the host actually wrote.
pub fn service_host_interrupt<B: SlaveBus, const N: usize>(
    bus: &mut B,
    events: &EventQueue<N>,
) -> Result<(), B::Error> {
    let status = bus.interrupt_status()? & Interrupts::HOST;
    bus.interrupt_clear(status)?;

    if status.contains(Interrupts::ERROR) {
        events.post(Event::Fault);
    }
    if status.contains(Interrupts::QUEUE_THRESHOLD) {
        bus.queue_service()?;
    }
    if status.contains(Interrupts::TRANSFER_COMPLETE) {
        let mut command = [0u8; 1];
        bus.read_window(0, &mut command)?;
        events.post(Event::TransactionComplete { command: command[0] });
    }
    Ok(())
}

/// Window access interrupt handler body.
pub fn service_access_interrupt<B: SlaveBus, const N: usize>(
    bus: &mut B,
    events: &EventQueue<N>,
) -> Result<(), B::Error> {
    let status = bus.interrupt_status()? & Interrupts::ACCESS;
    bus.interrupt_clear(status)?;

    if status.contains(Interrupts::HEADER) {
        events.post(Event::HeaderReady);
    }
    if status.contains(Interrupts::WATERMARK_START) {
        events.post(Event::WatermarkStart);
    }
    if status.contains(Interrupts::WATERMARK_HALF) {
        events.post(Event::WatermarkHalf);
    }
    Ok(())
}
