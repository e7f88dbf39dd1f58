//! In-memory slave peripheral with a simulated bus master.
//!
//! [`MemoryBus`] implements [`SlaveBus`] over a plain byte array and a
//! [`heapless::Deque`] outbound queue. Its `host_*` methods play the bus
//! master: they write the window, latch the interrupt bits real hardware would
//! raise, and drain the outbound queue.
//!
//! ```ignore
//! let mut bus: MemoryBus<256, 1023> = MemoryBus::new();
//! let mut host = HostWriter::new(geometry);
//! host.write(&mut bus, &message);   // latches HEADER / WATERMARK_* as it goes
//! bus.host_end_transaction();         // latches TRANSFER_COMPLETE
//! ```

use heapless::{Deque, Vec};

use super::{Interrupts, SlaveBus};
use crate::config::{Interface, SlaveConfig};
use crate::error::WindowFault;
use crate::geometry::WindowGeometry;

/// Number of queue write sizes remembered by [`MemoryBus::write_log`].
const WRITE_LOG_LEN: usize = 16;

/// Window of `W` bytes and an outbound queue of `Q` bytes.
pub struct MemoryBus<const W: usize, const Q: usize> {
    window: [u8; W],
    queue: Deque<u8, Q>,
    geometry: Option<WindowGeometry>,
    interface: Option<(u8, Interface)>,
    enabled: Interrupts,
    pending: Interrupts,
    handshake_armed: bool,
    notifications: usize,
    last_signal: u8,
    commits: usize,
    queue_services: usize,
    write_log: Vec<usize, WRITE_LOG_LEN>,
}

impl<const W: usize, const Q: usize> MemoryBus<W, Q> {
    /// Uninitialized peripheral with a zeroed window and empty queue.
    pub const fn new() -> Self {
        MemoryBus {
            window: [0u8; W],
            queue: Deque::new(),
            geometry: None,
            interface: None,
            enabled: Interrupts::NONE,
            pending: Interrupts::NONE,
            handshake_armed: false,
            notifications: 0,
            last_signal: 0,
            commits: 0,
            queue_services: 0,
            write_log: Vec::new(),
        }
    }

    fn check(&self, offset: usize, len: usize) -> Result<(), WindowFault> {
        let limit = self.geometry.map_or(W, |g| g.capacity());
        match offset.checked_add(len) {
            Some(end) if end <= limit => Ok(()),
            _ => Err(WindowFault::OutOfBounds { offset, len, capacity: limit }),
        }
    }

    // ── Bus master side ────────────────────────────────────────────────

    /// Latch `mask` in the status register, filtered by the enable mask.
    pub fn raise(&mut self, mask: Interrupts) {
        self.pending |= mask & self.enabled;
    }

    /// Host writes a one-byte command transaction to offset 0.
    pub fn host_command(&mut self, command: u8) {
        self.window[0] = command;
        self.raise(Interrupts::TRANSFER_COMPLETE);
    }

    /// Host writes one byte at `offset` inside an open transaction.
    ///
    /// Latches the header and watermark bits at their trigger offsets.
    pub fn host_write(&mut self, offset: usize, byte: u8) {
        self.window[offset] = byte;
        if offset == 1 {
            self.raise(Interrupts::HEADER);
        }
        if let Some(g) = self.geometry {
            if offset == g.wrap_start() {
                self.raise(Interrupts::WATERMARK_START);
            }
            if offset == g.wrap_half() {
                self.raise(Interrupts::WATERMARK_HALF);
            }
        }
    }

    /// Host releases the bus after a burst write.
    pub fn host_end_transaction(&mut self) {
        self.raise(Interrupts::TRANSFER_COMPLETE);
    }

    /// Host drains up to `dst.len()` bytes from the outbound queue.
    pub fn host_read(&mut self, dst: &mut [u8]) -> usize {
        let mut n = 0;
        for slot in dst.iter_mut() {
            match self.queue.pop_front() {
                Some(b) => *slot = b,
                None => break,
            }
            n += 1;
        }
        n
    }

    // ── Inspection ─────────────────────────────────────────────────────

    /// Raw window contents.
    pub fn window(&self) -> &[u8] {
        &self.window
    }

    /// Latched interrupt status bits.
    pub fn pending(&self) -> Interrupts {
        self.pending
    }

    /// Currently enabled interrupts.
    pub fn enabled(&self) -> Interrupts {
        self.enabled
    }

    /// Module and interface from `initialize`, `None` once deinitialized.
    pub fn interface(&self) -> Option<(u8, Interface)> {
        self.interface
    }

    /// Geometry from the last `configure`.
    pub fn geometry(&self) -> Option<WindowGeometry> {
        self.geometry
    }

    /// Bytes waiting in the outbound queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Whether `arm_handshake` ran since initialization.
    pub fn handshake_armed(&self) -> bool {
        self.handshake_armed
    }

    /// Number of host notifications raised so far.
    pub fn notifications(&self) -> usize {
        self.notifications
    }

    /// Signal bits of the latest notification.
    pub fn last_signal(&self) -> u8 {
        self.last_signal
    }

    /// Number of `queue_commit` calls.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Number of `queue_service` calls.
    pub fn queue_services(&self) -> usize {
        self.queue_services
    }

    /// Requested lengths of the most recent queue writes, oldest first.
    pub fn write_log(&self) -> &[usize] {
        &self.write_log
    }

    /// Forget the recorded queue writes.
    pub fn clear_write_log(&mut self) {
        self.write_log.clear();
    }
}

impl<const W: usize, const Q: usize> Default for MemoryBus<W, Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize, const Q: usize> SlaveBus for MemoryBus<W, Q> {
    type Error = WindowFault;

    fn initialize(&mut self, module: u8, interface: Interface) -> Result<(), WindowFault> {
        self.interface = Some((module, interface));
        Ok(())
    }

    fn configure(&mut self, config: &SlaveConfig) -> Result<(), WindowFault> {
        let capacity = config.geometry.capacity();
        if capacity > W {
            return Err(WindowFault::OutOfBounds { offset: 0, len: capacity, capacity: W });
        }
        self.geometry = Some(config.geometry);
        Ok(())
    }

    fn deinitialize(&mut self) -> Result<(), WindowFault> {
        self.interface = None;
        self.geometry = None;
        self.enabled = Interrupts::NONE;
        self.pending = Interrupts::NONE;
        Ok(())
    }

    fn interrupt_status(&mut self) -> Result<Interrupts, WindowFault> {
        Ok(self.pending)
    }

    fn interrupt_clear(&mut self, mask: Interrupts) -> Result<(), WindowFault> {
        self.pending = self.pending.without(mask);
        Ok(())
    }

    fn interrupt_enable(&mut self, mask: Interrupts) -> Result<(), WindowFault> {
        self.enabled |= mask;
        Ok(())
    }

    fn interrupt_disable(&mut self, mask: Interrupts) -> Result<(), WindowFault> {
        self.enabled = self.enabled.without(mask);
        Ok(())
    }

    fn read_window(&mut self, offset: usize, dst: &mut [u8]) -> Result<(), WindowFault> {
        self.check(offset, dst.len())?;
        dst.copy_from_slice(&self.window[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_window(&mut self, offset: usize, src: &[u8]) -> Result<(), WindowFault> {
        self.check(offset, src.len())?;
        self.window[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn queue_write(&mut self, bytes: &[u8]) -> Result<usize, WindowFault> {
        if self.write_log.is_full() {
            self.write_log.remove(0);
        }
        let _ = self.write_log.push(bytes.len());

        let mut accepted = 0;
        for &b in bytes {
            if self.queue.push_back(b).is_err() {
                break;
            }
            accepted += 1;
        }
        Ok(accepted)
    }

    fn queue_space_used(&mut self) -> Result<usize, WindowFault> {
        Ok(self.queue.len())
    }

    fn queue_clear(&mut self) -> Result<(), WindowFault> {
        self.queue.clear();
        Ok(())
    }

    fn queue_service(&mut self) -> Result<(), WindowFault> {
        self.queue_services += 1;
        Ok(())
    }

    fn queue_commit(&mut self) -> Result<(), WindowFault> {
        self.commits += 1;
        Ok(())
    }

    fn notify_host(&mut self, signal: u8) -> Result<(), WindowFault> {
        self.notifications += 1;
        self.last_signal = signal;
        Ok(())
    }

    fn arm_handshake(&mut self) -> Result<(), WindowFault> {
        self.handshake_armed = true;
        Ok(())
    }
}

/// Bus master streaming one message into the wraparound window.
///
/// Tracks the stream position so every byte lands where the hardware would
/// put it, wrapping from `capacity` back to `wrap_start`.
#[derive(Debug, Clone, Copy)]
pub struct HostWriter {
    geometry: WindowGeometry,
    written: usize,
}

impl HostWriter {
    /// Host cursor at stream index 0.
    pub const fn new(geometry: WindowGeometry) -> Self {
        HostWriter { geometry, written: 0 }
    }

    /// Write the next stream byte.
    pub fn write_byte<const W: usize, const Q: usize>(&mut self, bus: &mut MemoryBus<W, Q>, byte: u8) {
        let offset = self.geometry.offset_of(self.written);
        bus.host_write(offset, byte);
        self.written += 1;
    }

    /// Write the next `bytes.len()` stream bytes.
    pub fn write<const W: usize, const Q: usize>(&mut self, bus: &mut MemoryBus<W, Q>, bytes: &[u8]) {
        for &b in bytes {
            self.write_byte(bus, b);
        }
    }

    /// Stream bytes written so far, header included.
    pub fn written(&self) -> usize {
        self.written
    }
}
