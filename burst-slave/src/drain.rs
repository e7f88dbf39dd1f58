//! Wraparound drain engine.
//!
//! Reassembles a message of up to `M` bytes that the host streams through a
//! window much smaller than the message. The engine copies only bytes the host
//! write cursor has already passed, at three points per lap:
//!
//! | Event | First lap | Later laps |
//! |-------|-----------|------------|
//! | watermark 1 (`wrap_start`) | `[read_cursor, wrap_start)` | `[wrap_half, capacity)` |
//! | watermark 2 (`wrap_half`) | `[read_cursor, wrap_half)` | `[wrap_start, wrap_half)` |
//! | transfer complete | everything left, wrapping once if needed | same |
//!
//! A watermark copy is skipped when it would reach the end of the message;
//! transfer complete always delivers the tail.
//!
//! ## Timing
//!
//! Correctness depends on the foreground draining each block before the host
//! comes back around to overwrite it: `wrap_half - wrap_start` bytes of slack
//! after watermark 1, `capacity - wrap_half` after watermark 2. A drain that
//! misses its slot cannot notice; only the message checksum can.

use log::debug;

use crate::bus::SlaveBus;
use crate::constants::HEADER_LEN;
use crate::error::HeaderError;
use crate::geometry::WindowGeometry;

/// Drain state plus the linear assembly buffer for messages up to `M` bytes.
pub struct DrainEngine<const M: usize> {
    geometry: WindowGeometry,
    buffer: [u8; M],
    /// Declared payload length of the current message.
    message_length: usize,
    /// First window offset not yet drained.
    read_cursor: usize,
    /// Bytes already copied into `buffer`.
    assembly_index: usize,
    active: bool,
}

impl<const M: usize> DrainEngine<M> {
    /// Idle engine for `geometry`.
    pub const fn new(geometry: WindowGeometry) -> Self {
        DrainEngine {
            geometry,
            buffer: [0u8; M],
            message_length: 0,
            read_cursor: 0,
            assembly_index: 0,
            active: false,
        }
    }

    /// Start a message from its little-endian length header.
    ///
    /// Returns the declared length. A length larger than the assembly buffer
    /// leaves the engine idle.
    pub fn begin(&mut self, header: [u8; HEADER_LEN]) -> Result<usize, HeaderError> {
        let declared = u16::from_le_bytes(header) as usize;
        if declared > M {
            return Err(HeaderError::LengthExceedsBuffer { declared, capacity: M });
        }

        self.message_length = declared;
        self.read_cursor = HEADER_LEN;
        self.assembly_index = 0;
        self.active = true;
        Ok(declared)
    }

    /// Abandon the current message.
    pub fn reset(&mut self) {
        self.message_length = 0;
        self.read_cursor = 0;
        self.assembly_index = 0;
        self.active = false;
    }

    /// Drain at watermark 1. Returns the number of bytes copied.
    pub fn on_watermark_start<B: SlaveBus>(&mut self, bus: &mut B) -> Result<usize, B::Error> {
        if !self.active {
            return Ok(0);
        }
        let wrap_start = self.geometry.wrap_start();

        let len = if self.assembly_index == 0 {
            // First lap: only the bytes between the header and wrap_start.
            if self.read_cursor >= wrap_start {
                return Ok(0);
            }
            wrap_start - self.read_cursor
        } else {
            // The host just wrapped: the upper block is complete.
            self.geometry.capacity() - self.read_cursor
        };

        if self.assembly_index + len >= self.message_length {
            return Ok(0);
        }

        self.copy(bus, self.read_cursor, len)?;
        self.read_cursor = wrap_start;
        debug!("drain 1 idx={} cursor={}", self.assembly_index, self.read_cursor);
        Ok(len)
    }

    /// Drain at watermark 2. Returns the number of bytes copied.
    pub fn on_watermark_half<B: SlaveBus>(&mut self, bus: &mut B) -> Result<usize, B::Error> {
        let wrap_half = self.geometry.wrap_half();
        if !self.active || self.read_cursor >= wrap_half {
            return Ok(0);
        }

        let len = wrap_half - self.read_cursor;
        if self.assembly_index + len >= self.message_length {
            return Ok(0);
        }

        self.copy(bus, self.read_cursor, len)?;
        self.read_cursor = wrap_half;
        debug!("drain 2 idx={} cursor={}", self.assembly_index, self.read_cursor);
        Ok(len)
    }

    /// Deliver the remainder once the host ends its write.
    ///
    /// Returns `true` if this call completed the message. Calling it again
    /// before the next [`begin`](Self::begin) changes nothing.
    pub fn on_transfer_complete<B: SlaveBus>(&mut self, bus: &mut B) -> Result<bool, B::Error> {
        if !self.active {
            return Ok(false);
        }

        let remaining = self.message_length - self.assembly_index;
        let tail = self.geometry.capacity() - self.read_cursor;

        if tail >= remaining {
            self.copy(bus, self.read_cursor, remaining)?;
        } else {
            self.copy(bus, self.read_cursor, tail)?;
            self.read_cursor = self.geometry.wrap_start();
            let rest = remaining - tail;
            let wrapped = rest.min(self.geometry.lap_len());
            if wrapped < rest {
                debug!("drain fell {} bytes behind the host", rest - wrapped);
            }
            self.copy(bus, self.read_cursor, wrapped)?;
        }
        debug!("drain 3 idx={} cursor={}", self.assembly_index, self.read_cursor);

        self.assembly_index = self.message_length;
        self.read_cursor = 0;
        self.active = false;
        Ok(true)
    }

    fn copy<B: SlaveBus>(&mut self, bus: &mut B, offset: usize, len: usize) -> Result<(), B::Error> {
        let start = self.assembly_index;
        bus.read_window(offset, &mut self.buffer[start..start + len])?;
        self.assembly_index += len;
        Ok(())
    }

    /// Whether a message is being drained.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Window geometry the engine drains.
    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    /// Length declared by the current header.
    pub fn message_length(&self) -> usize {
        self.message_length
    }

    /// Next window offset to copy from.
    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    /// Bytes copied into the assembly buffer.
    pub fn assembly_index(&self) -> usize {
        self.assembly_index
    }

    /// Bytes assembled so far; the whole message once complete.
    pub fn message(&self) -> &[u8] {
        &self.buffer[..self.assembly_index]
    }

    /// Largest message the assembly buffer holds.
    pub const fn buffer_capacity(&self) -> usize {
        M
    }
}
