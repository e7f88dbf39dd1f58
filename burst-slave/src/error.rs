//! Error taxonomy.
//!
//! Only [`SlaveError`] is ever returned from foreground operations. Malformed
//! headers and checksum failures end the session and are reported through
//! [`Application`](crate::session::Application) and
//! [`SessionStats`](crate::session::SessionStats) instead.

use thiserror::Error;

/// Invalid window geometry or streaming configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("wrap start {wrap_start:#x} must precede wrap half {wrap_half:#x}")]
    StartNotBeforeHalf { wrap_start: usize, wrap_half: usize },

    #[error("wrap half {wrap_half:#x} lies outside a {capacity}-byte window")]
    HalfOutsideWindow { wrap_half: usize, capacity: usize },

    #[error("wrap half {wrap_half:#x} overlaps the length header")]
    HalfInsideHeader { wrap_half: usize },

    #[error("window capacity {capacity} exceeds the 16-bit address space")]
    WindowTooLarge { capacity: usize },

    #[error("egress frame size must be non-zero")]
    EmptyFrame,

    #[error("sample ring of {capacity} bytes cannot hold two {frame_size}-byte frames")]
    SampleRingTooSmall { capacity: usize, frame_size: usize },
}

/// Length header the drain engine cannot accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("host declared {declared} bytes, assembly buffer holds {capacity}")]
    LengthExceedsBuffer { declared: usize, capacity: usize },
}

/// Integrity check failure on a fully drained message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("checksum mismatch: computed {computed:#04x}, received {received:#04x}")]
    Mismatch { computed: u8, received: u8 },

    #[error("message too short to carry a checksum")]
    MissingChecksum,
}

/// Error returned by [`Slave`](crate::session::Slave) operations.
///
/// Wraps the bus collaborator's own error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlaveError<E> {
    #[error("bus access failed: {0:?}")]
    Bus(E),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl<E> SlaveError<E> {
    /// Lift a bus error, for use with `map_err`.
    pub fn bus(err: E) -> Self {
        SlaveError::Bus(err)
    }
}

/// Window access outside the mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WindowFault {
    #[error("access of {len} bytes at {offset:#x} overruns a {capacity}-byte window")]
    OutOfBounds { offset: usize, len: usize, capacity: usize },
}
