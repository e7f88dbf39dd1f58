//! Wraparound window geometry.
//!
//! The host writes a message into the window linearly from offset 0. When its
//! write cursor reaches `capacity` it wraps back to `wrap_start`, so the
//! circulating region of every lap after the first is `[wrap_start, capacity)`.
//!
//! ```text
//! 0    2         wrap_start            wrap_half                capacity
//! ├────┼─────────────┼─────────────────────┼────────────────────────┤
//! │len │  first lap  │ ◄──── watermark 1   │ ◄──── watermark 2      │
//! └────┴─────────────┴─────────────────────┴────────────────────────┘
//!                    ▲                                              │
//!                    └──────────────── wrap ────────────────────────┘
//! ```

use crate::constants::HEADER_LEN;
use crate::error::ConfigError;

/// Static description of the shared-memory window.
///
/// Invariant: `wrap_start < wrap_half < capacity`, `wrap_half > HEADER_LEN`,
/// and `capacity` fits in a 16-bit address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    wrap_start: usize,
    wrap_half: usize,
    capacity: usize,
}

impl WindowGeometry {
    /// Validate and build a geometry.
    pub const fn new(wrap_start: usize, wrap_half: usize, capacity: usize) -> Result<Self, ConfigError> {
        if capacity > u16::MAX as usize {
            return Err(ConfigError::WindowTooLarge { capacity });
        }
        if wrap_start >= wrap_half {
            return Err(ConfigError::StartNotBeforeHalf { wrap_start, wrap_half });
        }
        if wrap_half >= capacity {
            return Err(ConfigError::HalfOutsideWindow { wrap_half, capacity });
        }
        if wrap_half <= HEADER_LEN {
            return Err(ConfigError::HalfInsideHeader { wrap_half });
        }
        Ok(Self::new_unchecked(wrap_start, wrap_half, capacity))
    }

    pub(crate) const fn new_unchecked(wrap_start: usize, wrap_half: usize, capacity: usize) -> Self {
        WindowGeometry {
            wrap_start,
            wrap_half,
            capacity,
        }
    }

    /// Offset the host write cursor wraps back to; also watermark 1.
    pub const fn wrap_start(&self) -> usize {
        self.wrap_start
    }

    /// Offset of watermark 2.
    pub const fn wrap_half(&self) -> usize {
        self.wrap_half
    }

    /// Total window size in bytes.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes the host writes per lap once it has wrapped.
    pub const fn lap_len(&self) -> usize {
        self.capacity - self.wrap_start
    }

    /// Block drained at watermark 2 on every lap after the first.
    pub const fn lower_block(&self) -> usize {
        self.wrap_half - self.wrap_start
    }

    /// Block drained at watermark 1 on every lap after the first.
    pub const fn upper_block(&self) -> usize {
        self.capacity - self.wrap_half
    }

    /// Window offset the host writes the `index`-th byte of its stream to,
    /// counting the length header.
    pub const fn offset_of(&self, index: usize) -> usize {
        if index < self.capacity {
            index
        } else {
            self.wrap_start + (index - self.capacity) % self.lap_len()
        }
    }

    /// Number of times the host cursor wraps while writing `stream_len` bytes.
    pub const fn wraps_for(&self, stream_len: usize) -> usize {
        if stream_len <= self.capacity {
            0
        } else {
            (stream_len - self.capacity).div_ceil(self.lap_len())
        }
    }
}
