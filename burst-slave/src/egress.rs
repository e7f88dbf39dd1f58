//! Egress streamer: fixed-size frames from a circular sample buffer.
//!
//! Each data tick pushes one frame of `frame_size` bytes starting at the ring
//! cursor into the peripheral's outbound queue. A frame that would run past
//! the end of the ring goes out as two queue writes, tail then head:
//!
//! ```text
//!  samples  ┌──────────────────────────────┐
//!           │ head ▓▓▓│            │▓▓▓▓ tail│
//!           └──────────────────────┬───────┘
//!                                cursor
//! ```
//!
//! A queue that accepts fewer bytes than offered drops the rest of that frame.
//! The cursor advances by what was accepted, so the next frame picks up right
//! after the last byte the host will actually see.

use log::trace;

use crate::bus::SlaveBus;

/// Outcome of one frame push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Push {
    /// Bytes offered to the queue.
    pub requested: usize,
    /// Bytes the queue accepted.
    pub written: usize,
    /// Number of `queue_write` calls issued.
    pub writes: u8,
}

impl Push {
    /// Bytes of this frame that never reached the queue.
    pub const fn dropped(&self) -> usize {
        self.requested - self.written
    }
}

/// Circular sample buffer of `S` bytes with a read cursor.
pub struct SampleRing<const S: usize> {
    samples: [u8; S],
    cursor: usize,
    running: bool,
}

impl<const S: usize> SampleRing<S> {
    /// Zero-filled ring, stopped.
    pub const fn new() -> Self {
        SampleRing {
            samples: [0u8; S],
            cursor: 0,
            running: false,
        }
    }

    /// Ring filled with the reference ramp `(i & 0xFF) ^ xor`.
    pub fn with_pattern(xor: u8) -> Self {
        let mut ring = Self::new();
        for (i, sample) in ring.samples.iter_mut().enumerate() {
            *sample = (i & 0xFF) as u8 ^ xor;
        }
        ring
    }

    /// Ring contents.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Sample storage, for the data source to fill.
    pub fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    /// Offset of the next frame.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether a read session is consuming the ring.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ring length in bytes.
    pub const fn capacity(&self) -> usize {
        S
    }

    /// Start streaming from the beginning of the ring.
    pub fn restart(&mut self) {
        self.cursor = 0;
        self.running = true;
    }

    /// Stop consuming; the cursor is kept until the next restart.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Push one `frame`-byte frame into the outbound queue.
    ///
    /// Does nothing while stopped. `frame` must not exceed `S`.
    pub fn push_frame<B: SlaveBus>(&mut self, bus: &mut B, frame: usize) -> Result<Push, B::Error> {
        if !self.running || frame == 0 {
            return Ok(Push::default());
        }

        let start = self.cursor;
        let tail = S - start;
        let mut push = Push {
            requested: frame,
            ..Push::default()
        };

        if tail > frame {
            push.written = bus.queue_write(&self.samples[start..start + frame])?;
            push.writes = 1;
        } else {
            push.written = bus.queue_write(&self.samples[start..])?;
            push.writes = 1;
            if push.written == tail && frame > tail {
                push.written += bus.queue_write(&self.samples[..frame - tail])?;
                push.writes = 2;
            }
        }

        self.cursor = (start + push.written) % S;

        if push.dropped() > 0 {
            trace!("egress queue full: dropped {} of {} bytes", push.dropped(), frame);
        } else {
            trace!("egress frame at {} in {} write(s)", start, push.writes);
        }
        Ok(push)
    }
}

impl<const S: usize> Default for SampleRing<S> {
    fn default() -> Self {
        Self::new()
    }
}
