//! Streaming configuration.
//!
//! One [`SlaveConfig`] value replaces the per-board compile-time selection of
//! window offsets. It is validated once, when the [`Slave`](crate::session::Slave)
//! is built.
//!
//! ```ignore
//! let geometry = WindowGeometry::new(0x08, 0x7F, 0xF0)?;
//! let config = SlaveConfig::new(geometry)
//!     .with_frame_size(48)
//!     .with_interface(Interface::I2c { address: 0x20 });
//! ```

use crate::checksum::Integrity;
use crate::constants::{DEFAULT_FRAME_SIZE, DEFAULT_GEOMETRY, DEFAULT_QUEUE_THRESHOLD};
use crate::error::ConfigError;
use crate::geometry::WindowGeometry;

/// Physical interface the host drives the slave peripheral through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    /// 4-wire SPI.
    Spi,
    /// I2C at the given 7-bit slave address.
    I2c { address: u8 },
}

/// Complete slave-side streaming configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaveConfig {
    /// Peripheral instance number handed to the bus driver.
    pub module: u8,
    pub interface: Interface,
    pub geometry: WindowGeometry,
    /// Bytes pushed into the outbound queue per data tick.
    pub frame_size: usize,
    /// Check applied to every fully drained message.
    pub integrity: Integrity,
    /// Outbound queue fill level, in bytes, that raises the queue interrupt.
    pub queue_threshold: usize,
}

impl SlaveConfig {
    /// Configuration for `geometry` with every other field at its default.
    pub const fn new(geometry: WindowGeometry) -> Self {
        SlaveConfig {
            module: 0,
            interface: Interface::Spi,
            geometry,
            frame_size: DEFAULT_FRAME_SIZE,
            integrity: Integrity::TrailingSum8,
            queue_threshold: DEFAULT_QUEUE_THRESHOLD,
        }
    }

    /// Peripheral instance number.
    pub const fn with_module(mut self, module: u8) -> Self {
        self.module = module;
        self
    }

    /// Host bus the peripheral is attached to.
    pub const fn with_interface(mut self, interface: Interface) -> Self {
        self.interface = interface;
        self
    }

    /// Bytes pushed to the outbound queue per data tick.
    pub const fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    /// Integrity check applied to completed writes.
    pub const fn with_integrity(mut self, integrity: Integrity) -> Self {
        self.integrity = integrity;
        self
    }

    /// Outbound queue fill level that raises the threshold interrupt.
    pub const fn with_queue_threshold(mut self, queue_threshold: usize) -> Self {
        self.queue_threshold = queue_threshold;
        self
    }

    /// Check the configuration against a sample ring of `sample_capacity` bytes.
    ///
    /// The geometry is re-validated because its fields can come from
    /// [`WindowGeometry::new`] or from a `const` table.
    pub fn validate(&self, sample_capacity: usize) -> Result<(), ConfigError> {
        let g = self.geometry;
        WindowGeometry::new(g.wrap_start(), g.wrap_half(), g.capacity())?;

        if self.frame_size == 0 {
            return Err(ConfigError::EmptyFrame);
        }
        if sample_capacity < self.frame_size * 2 {
            return Err(ConfigError::SampleRingTooSmall {
                capacity: sample_capacity,
                frame_size: self.frame_size,
            });
        }
        Ok(())
    }
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GEOMETRY)
    }
}
