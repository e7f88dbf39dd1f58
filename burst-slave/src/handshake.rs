//! Host notification line driven from a GPIO.
//!
//! Some peripherals have no dedicated slave-interrupt output, so the
//! "data available" signal goes out on a plain pin instead. [`Handshaked`]
//! wraps any [`SlaveBus`] and drives an [`OutputPin`] alongside it:
//!
//! | Bus call | Pin |
//! |----------|-----|
//! | `arm_handshake` | low |
//! | `interrupt_clear` | low |
//! | `notify_host` | high |
//!
//! The line drops on every interrupt clear, so the host sees one pulse per
//! notification and never a stale level from the previous block.

use embedded_hal::digital::OutputPin;
use thiserror::Error;

use crate::bus::{Interrupts, SlaveBus};
use crate::config::{Interface, SlaveConfig};

/// Failure of either the wrapped bus or the notification pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandshakeError<BE, PE> {
    #[error("bus: {0:?}")]
    Bus(BE),
    #[error("notification pin: {0:?}")]
    Pin(PE),
}

/// [`SlaveBus`] adapter raising the host notification on `pin`.
pub struct Handshaked<B, P> {
    bus: B,
    pin: P,
}

impl<B, P> Handshaked<B, P>
where
    B: SlaveBus,
    P: OutputPin,
{
    /// Wrap `bus`, driving `pin` as the notification line.
    pub fn new(bus: B, pin: P) -> Self {
        Handshaked { bus, pin }
    }

    /// Wrapped bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Wrapped bus, mutably.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Notification pin.
    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Give back the bus and the pin.
    pub fn release(self) -> (B, P) {
        (self.bus, self.pin)
    }

    fn lower(&mut self) -> Result<(), HandshakeError<B::Error, P::Error>> {
        self.pin.set_low().map_err(HandshakeError::Pin)
    }
}

impl<B, P> SlaveBus for Handshaked<B, P>
where
    B: SlaveBus,
    P: OutputPin,
{
    type Error = HandshakeError<B::Error, P::Error>;

    fn initialize(&mut self, module: u8, interface: Interface) -> Result<(), Self::Error> {
        self.bus.initialize(module, interface).map_err(HandshakeError::Bus)
    }

    fn configure(&mut self, config: &SlaveConfig) -> Result<(), Self::Error> {
        self.bus.configure(config).map_err(HandshakeError::Bus)
    }

    fn deinitialize(&mut self) -> Result<(), Self::Error> {
        self.bus.deinitialize().map_err(HandshakeError::Bus)?;
        self.lower()
    }

    fn interrupt_status(&mut self) -> Result<Interrupts, Self::Error> {
        self.bus.interrupt_status().map_err(HandshakeError::Bus)
    }

    fn interrupt_clear(&mut self, mask: Interrupts) -> Result<(), Self::Error> {
        self.bus.interrupt_clear(mask).map_err(HandshakeError::Bus)?;
        self.lower()
    }

    fn interrupt_enable(&mut self, mask: Interrupts) -> Result<(), Self::Error> {
        self.bus.interrupt_enable(mask).map_err(HandshakeError::Bus)
    }

    fn interrupt_disable(&mut self, mask: Interrupts) -> Result<(), Self::Error> {
        self.bus.interrupt_disable(mask).map_err(HandshakeError::Bus)
    }

    fn read_window(&mut self, offset: usize, dst: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.read_window(offset, dst).map_err(HandshakeError::Bus)
    }

    fn write_window(&mut self, offset: usize, src: &[u8]) -> Result<(), Self::Error> {
        self.bus.write_window(offset, src).map_err(HandshakeError::Bus)
    }

    fn queue_write(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        self.bus.queue_write(bytes).map_err(HandshakeError::Bus)
    }

    fn queue_space_used(&mut self) -> Result<usize, Self::Error> {
        self.bus.queue_space_used().map_err(HandshakeError::Bus)
    }

    fn queue_clear(&mut self) -> Result<(), Self::Error> {
        self.bus.queue_clear().map_err(HandshakeError::Bus)
    }

    fn queue_service(&mut self) -> Result<(), Self::Error> {
        self.bus.queue_service().map_err(HandshakeError::Bus)
    }

    fn queue_commit(&mut self) -> Result<(), Self::Error> {
        self.bus.queue_commit().map_err(HandshakeError::Bus)
    }

    fn notify_host(&mut self, signal: u8) -> Result<(), Self::Error> {
        self.bus.notify_host(signal).map_err(HandshakeError::Bus)?;
        self.pin.set_high().map_err(HandshakeError::Pin)
    }

    fn arm_handshake(&mut self) -> Result<(), Self::Error> {
        self.bus.arm_handshake().map_err(HandshakeError::Bus)?;
        self.lower()
    }
}
